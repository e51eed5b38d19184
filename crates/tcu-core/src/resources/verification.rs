//! Verification of admitted applicants by the provider

use serde::{Deserialize, Serialize};

use crate::client::TcuClient;
use crate::error::CallResult;
use crate::http::Method;
use crate::resources::response_records;
use crate::resources::validation::Validator;
use crate::xml::{Node, NodeError, ParamBlock};

/// Verification outcome for one applicant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationStatus {
    pub f4indexno: String,
    pub verification_status: Option<String>,
    pub remarks: Option<String>,
}

impl VerificationStatus {
    pub fn from_node(node: &Node) -> Result<Self, NodeError> {
        Ok(Self {
            f4indexno: node.text("f4indexno")?.to_string(),
            verification_status: node.opt_text("VerificationStatus")?.map(str::to_string),
            remarks: node.opt_text("Remarks")?.map(str::to_string),
        })
    }
}

pub struct Verification<'a> {
    client: &'a TcuClient,
}

impl<'a> Verification<'a> {
    pub(crate) fn new(client: &'a TcuClient) -> Self {
        Self { client }
    }

    /// Verification status of every applicant admitted to a programme
    pub async fn applicant_status(&self, programme_code: &str) -> CallResult<Vec<VerificationStatus>> {
        let mut v = Validator::new();
        v.programme_code("programme_code", programme_code);
        v.finish()?;

        let tree = self
            .client
            .execute(
                "/applicants/getApplicantVerificationStatus",
                ParamBlock::new().with("ProgrammeCode", programme_code.trim()),
                Method::POST,
            )
            .await?;
        let statuses = response_records(&tree, Some("Applicant"))?
            .into_iter()
            .map(VerificationStatus::from_node)
            .collect::<Result<_, _>>()?;
        Ok(statuses)
    }
}
