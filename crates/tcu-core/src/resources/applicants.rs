//! Applicant registration, programme selection and confirmation

use serde::{Deserialize, Serialize};

use crate::client::TcuClient;
use crate::error::CallResult;
use crate::http::Method;
use crate::resources::response_records;
use crate::resources::validation::Validator;
use crate::xml::{Node, NodeError, ParamBlock, ParamBlocks};

/// Status of one applicant as reported by the provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicantStatus {
    pub f4indexno: String,
    pub status: Option<String>,
    pub status_code: Option<String>,
    pub description: Option<String>,
}

impl ApplicantStatus {
    pub fn from_node(node: &Node) -> Result<Self, NodeError> {
        Ok(Self {
            f4indexno: node.text("f4indexno")?.to_string(),
            status: node.opt_text("Status")?.map(str::to_string),
            status_code: node.opt_text("StatusCode")?.map(str::to_string),
            description: node.opt_text("StatusDescription")?.map(str::to_string),
        })
    }
}

/// Result of a status check over one or more index numbers
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusCheck {
    pub applicants: Vec<ApplicantStatus>,
}

impl StatusCheck {
    /// Accepts either `ResponseParameters` holding one applicant's fields
    /// directly, or repeated `Applicant` records inside it
    pub fn from_node(tree: &Node) -> Result<Self, NodeError> {
        let mut records = response_records(tree, Some("Applicant"))?;
        if records.is_empty() {
            records = response_records(tree, None)?;
        }
        let applicants = records
            .into_iter()
            .map(ApplicantStatus::from_node)
            .collect::<Result<_, _>>()?;
        Ok(Self { applicants })
    }

    pub fn get(&self, f4indexno: &str) -> Option<&ApplicantStatus> {
        self.applicants.iter().find(|a| a.f4indexno == f4indexno)
    }
}

/// An applicant to register with the provider
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewApplicant {
    pub f4indexno: String,
    #[serde(default)]
    pub f6indexno: Option<String>,
    /// Additional form four sittings
    #[serde(default)]
    pub other_f4indexno: Vec<String>,
    #[serde(default)]
    pub other_f6indexno: Vec<String>,
    /// Admission category code, e.g. `A` for direct entry
    pub category: String,
}

impl NewApplicant {
    fn validate(&self, v: &mut Validator, prefix: &str) {
        let field = |name: &str| format!("{}{}", prefix, name);
        v.f4_index(&field("f4indexno"), &self.f4indexno)
            .optional(self.f6indexno.as_deref(), |v, s| {
                v.f6_index(&field("f6indexno"), s);
            })
            .required(&field("category"), &self.category);
        for other in &self.other_f4indexno {
            v.f4_index(&field("other_f4indexno"), other);
        }
        for other in &self.other_f6indexno {
            v.f6_index(&field("other_f6indexno"), other);
        }
    }

    fn to_block(&self) -> ParamBlock {
        let mut block = ParamBlock::new().with("f4indexno", self.f4indexno.trim());
        block.insert_opt("f6indexno", self.f6indexno.as_deref());
        if !self.other_f4indexno.is_empty() {
            block.insert("Otherf4indexno", self.other_f4indexno.clone());
        }
        if !self.other_f6indexno.is_empty() {
            block.insert("Otherf6indexno", self.other_f6indexno.clone());
        }
        block.with("Category", self.category.trim())
    }
}

/// Programme choices and contact details of an applicant
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgrammeSubmission {
    pub f4indexno: String,
    #[serde(default)]
    pub f6indexno: Option<String>,
    /// Programme codes in order of preference
    pub selected_programmes: Vec<String>,
    pub mobile_number: String,
    #[serde(default)]
    pub other_mobile_number: Option<String>,
    pub email_address: String,
    pub admission_status: String,
    #[serde(default)]
    pub programme_admitted: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
}

impl ProgrammeSubmission {
    fn validate(&self, v: &mut Validator) {
        v.f4_index("f4indexno", &self.f4indexno)
            .optional(self.f6indexno.as_deref(), |v, s| {
                v.f6_index("f6indexno", s);
            })
            .non_empty("selected_programmes", &self.selected_programmes)
            .phone("mobile_number", &self.mobile_number)
            .optional(self.other_mobile_number.as_deref(), |v, s| {
                v.phone("other_mobile_number", s);
            })
            .email("email_address", &self.email_address)
            .required("admission_status", &self.admission_status)
            .optional(self.programme_admitted.as_deref(), |v, s| {
                v.programme_code("programme_admitted", s);
            });
        for code in &self.selected_programmes {
            v.programme_code("selected_programmes", code);
        }
    }

    fn to_block(&self) -> ParamBlock {
        let mut block = ParamBlock::new()
            .with("f4indexno", self.f4indexno.trim())
            .with("SelectedProgrammes", self.selected_programmes.join(","))
            .with("MobileNumber", self.mobile_number.trim())
            .with("EmailAddress", self.email_address.trim())
            .with("AdmissionStatus", self.admission_status.trim());
        block.insert_opt("f6indexno", self.f6indexno.as_deref());
        block.insert_opt("OtherMobileNumber", self.other_mobile_number.as_deref());
        block.insert_opt("ProgrammeAdmitted", self.programme_admitted.as_deref());
        block.insert_opt("Reason", self.reason.as_deref());
        block
    }
}

/// Applicant operations
pub struct Applicants<'a> {
    client: &'a TcuClient,
}

impl<'a> Applicants<'a> {
    pub(crate) fn new(client: &'a TcuClient) -> Self {
        Self { client }
    }

    /// Check whether applicants are already admitted elsewhere
    pub async fn check_status(&self, index_numbers: &[&str]) -> CallResult<StatusCheck> {
        let mut v = Validator::new();
        v.non_empty("f4indexno", index_numbers);
        for index in index_numbers {
            v.f4_index("f4indexno", index);
        }
        v.finish()?;

        let values: Vec<String> = index_numbers.iter().map(|s| s.trim().to_string()).collect();
        let tree = self
            .client
            .execute(
                "/applicants/checkStatus",
                ParamBlock::new().with("f4indexno", values),
                Method::POST,
            )
            .await?;
        Ok(StatusCheck::from_node(&tree)?)
    }

    /// Register a batch of applicants, one parameter block each
    pub async fn add(&self, applicants: &[NewApplicant]) -> CallResult<Node> {
        let mut v = Validator::new();
        v.non_empty("applicants", applicants);
        for (i, applicant) in applicants.iter().enumerate() {
            applicant.validate(&mut v, &format!("applicants[{}].", i));
        }
        v.finish()?;

        let blocks: Vec<ParamBlock> = applicants.iter().map(NewApplicant::to_block).collect();
        self.client
            .execute("/applicants/add", ParamBlocks::from(blocks), Method::POST)
            .await
    }

    pub async fn submit_programme(&self, submission: &ProgrammeSubmission) -> CallResult<Node> {
        self.send_submission("/applicants/submitProgramme", submission).await
    }

    /// Submit corrected programme choices for an applicant
    pub async fn resubmit(&self, submission: &ProgrammeSubmission) -> CallResult<Node> {
        self.send_submission("/applicants/resubmit", submission).await
    }

    /// Confirm admission to this institution with the applicant's code
    pub async fn confirm(&self, f4indexno: &str, confirmation_code: &str) -> CallResult<Node> {
        self.send_confirmation("/admission/confirm", f4indexno, confirmation_code)
            .await
    }

    /// Withdraw a previous confirmation
    pub async fn unconfirm(&self, f4indexno: &str, confirmation_code: &str) -> CallResult<Node> {
        self.send_confirmation("/admission/unconfirm", f4indexno, confirmation_code)
            .await
    }

    /// Status of every applicant to one programme
    pub async fn get_status(&self, programme_code: &str) -> CallResult<Vec<ApplicantStatus>> {
        let mut v = Validator::new();
        v.programme_code("programme_code", programme_code);
        v.finish()?;

        let tree = self
            .client
            .execute(
                "/applicants/getStatus",
                ParamBlock::new().with("ProgrammeCode", programme_code.trim()),
                Method::POST,
            )
            .await?;
        Ok(StatusCheck::from_node(&tree)?.applicants)
    }

    async fn send_submission(&self, path: &str, submission: &ProgrammeSubmission) -> CallResult<Node> {
        let mut v = Validator::new();
        submission.validate(&mut v);
        v.finish()?;

        self.client.execute(path, submission.to_block(), Method::POST).await
    }

    async fn send_confirmation(&self, path: &str, f4indexno: &str, code: &str) -> CallResult<Node> {
        let mut v = Validator::new();
        v.f4_index("f4indexno", f4indexno)
            .confirmation_code("confirmation_code", code);
        v.finish()?;

        let block = ParamBlock::new()
            .with("f4indexno", f4indexno.trim())
            .with("ConfirmationCode", code);
        self.client.execute(path, block, Method::POST).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xml::decode_response;

    #[test]
    fn test_status_check_single_record() {
        let tree = decode_response(
            b"<Response><ResponseParameters><f4indexno>S0123456789</f4indexno>\
              <Status>OK</Status></ResponseParameters></Response>",
        )
        .unwrap();
        let check = StatusCheck::from_node(&tree).unwrap();
        assert_eq!(check.applicants.len(), 1);
        assert_eq!(check.get("S0123456789").unwrap().status.as_deref(), Some("OK"));
    }

    #[test]
    fn test_status_check_repeated_records() {
        let tree = decode_response(
            b"<Response><ResponseParameters>\
              <Applicant><f4indexno>A</f4indexno><StatusCode>200</StatusCode></Applicant>\
              <Applicant><f4indexno>B</f4indexno><StatusCode>208</StatusCode>\
              <StatusDescription>Admitted elsewhere</StatusDescription></Applicant>\
              </ResponseParameters></Response>",
        )
        .unwrap();
        let check = StatusCheck::from_node(&tree).unwrap();
        assert_eq!(check.applicants.len(), 2);
        let b = check.get("B").unwrap();
        assert_eq!(b.status_code.as_deref(), Some("208"));
        assert_eq!(b.description.as_deref(), Some("Admitted elsewhere"));
    }

    #[test]
    fn test_status_check_missing_index_is_an_error() {
        let tree = decode_response(b"<Response><ResponseParameters><Status>OK</Status></ResponseParameters></Response>")
            .unwrap();
        assert!(matches!(
            StatusCheck::from_node(&tree),
            Err(NodeError::FieldNotFound { .. })
        ));
    }

    #[test]
    fn test_new_applicant_block() {
        let applicant = NewApplicant {
            f4indexno: "S0123/0001/2019".into(),
            f6indexno: Some("S0123/0501/2021".into()),
            other_f4indexno: vec!["P0456/0002/2018".into(), "P0456/0003/2017".into()],
            other_f6indexno: vec![],
            category: "A".into(),
        };
        let block = applicant.to_block();
        let names: Vec<&str> = block.fields().iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(names, ["f4indexno", "f6indexno", "Otherf4indexno", "Category"]);
        assert_eq!(block.get("Otherf4indexno").unwrap().values().len(), 2);
    }

    #[test]
    fn test_batch_validation_names_the_record() {
        let mut v = Validator::new();
        let bad = NewApplicant {
            f4indexno: "nope".into(),
            category: String::new(),
            ..Default::default()
        };
        bad.validate(&mut v, "applicants[1].");
        let errors = v.finish().unwrap_err();
        assert_eq!(errors.for_field("applicants[1].f4indexno").count(), 1);
        assert_eq!(errors.for_field("applicants[1].category").count(), 1);
    }

    #[test]
    fn test_submission_validation() {
        let submission = ProgrammeSubmission {
            f4indexno: "S0123/0001/2019".into(),
            selected_programmes: vec!["UD023".into(), "bad code!".into()],
            mobile_number: "0712345678".into(),
            email_address: "applicant@example.ac.tz".into(),
            admission_status: "provisional admission".into(),
            ..Default::default()
        };
        let mut v = Validator::new();
        submission.validate(&mut v);
        let errors = v.finish().unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors.iter().next().unwrap().field, "selected_programmes");

        let block = submission.to_block();
        assert_eq!(
            block.get("SelectedProgrammes").unwrap().values(),
            ["UD023,bad code!".to_string()]
        );
    }
}
