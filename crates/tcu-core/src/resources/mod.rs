//! Resource operations of the TCU admissions API
//!
//! Each resource validates its input, shapes it into parameter blocks and
//! hands it to the pipeline. Validation failures return before any request is
//! built, so they never reach the call log.

mod admissions;
mod applicants;
mod dashboard;
mod transfers;
pub mod validation;
mod verification;

pub use admissions::{Admissions, AdmittedApplicant};
pub use applicants::{
    ApplicantStatus, Applicants, NewApplicant, ProgrammeSubmission, StatusCheck,
};
pub use dashboard::Dashboard;
pub use transfers::{Transfer, TransferStatus, Transfers};
pub use validation::{FieldError, ValidationErrors, Validator};
pub use verification::{Verification, VerificationStatus};

use crate::xml::Node;

/// Records under `ResponseParameters`, whether the tag appeared once or many times
///
/// An empty `ResponseParameters` element yields no records.
pub(crate) fn response_records<'a>(tree: &'a Node, record_tag: Option<&str>) -> Result<Vec<&'a Node>, crate::xml::NodeError> {
    let parameters = tree.field("ResponseParameters")?;
    let mut records = Vec::new();
    for item in parameters.items() {
        match (record_tag, item) {
            (_, Node::Leaf(text)) if text.trim().is_empty() => {}
            (Some(tag), node) => {
                if let Some(inner) = node.get(tag) {
                    records.extend(inner.items());
                }
            }
            (None, node) => records.push(node),
        }
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xml::decode_response;

    #[test]
    fn test_response_records_single_and_repeated() {
        let one = decode_response(b"<Response><ResponseParameters><a>1</a></ResponseParameters></Response>").unwrap();
        assert_eq!(response_records(&one, None).unwrap().len(), 1);

        let many = decode_response(
            b"<Response><ResponseParameters><Applicant><a>1</a></Applicant>\
              <Applicant><a>2</a></Applicant></ResponseParameters></Response>",
        )
        .unwrap();
        let records = response_records(&many, Some("Applicant")).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].text("a").unwrap(), "2");
    }

    #[test]
    fn test_response_records_requires_parameters() {
        let tree = decode_response(b"<Response><Other/></Response>").unwrap();
        assert!(response_records(&tree, None).is_err());
    }
}
