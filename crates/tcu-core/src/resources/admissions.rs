//! Admitted and confirmed applicant lists

use serde::{Deserialize, Serialize};

use crate::client::TcuClient;
use crate::error::CallResult;
use crate::http::Method;
use crate::resources::response_records;
use crate::resources::validation::Validator;
use crate::xml::{Node, NodeError, ParamBlock};

/// One applicant from an admitted or confirmed list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdmittedApplicant {
    pub f4indexno: String,
    pub f6indexno: Option<String>,
    pub mobile_number: Option<String>,
    pub email_address: Option<String>,
    pub admission_status: Option<String>,
}

impl AdmittedApplicant {
    pub fn from_node(node: &Node) -> Result<Self, NodeError> {
        let opt = |path| node.opt_text(path).map(|s| s.map(str::to_string));
        Ok(Self {
            f4indexno: node.text("f4indexno")?.to_string(),
            f6indexno: opt("f6indexno")?,
            mobile_number: opt("MobileNumber")?,
            email_address: opt("EmailAddress")?,
            admission_status: opt("AdmissionStatus")?,
        })
    }

    fn list(tree: &Node) -> Result<Vec<Self>, NodeError> {
        response_records(tree, Some("Applicant"))?
            .into_iter()
            .map(Self::from_node)
            .collect()
    }
}

pub struct Admissions<'a> {
    client: &'a TcuClient,
}

impl<'a> Admissions<'a> {
    pub(crate) fn new(client: &'a TcuClient) -> Self {
        Self { client }
    }

    /// Applicants admitted to a programme
    pub async fn get_admitted(&self, programme_code: &str) -> CallResult<Vec<AdmittedApplicant>> {
        let tree = self.by_programme("/applicants/getAdmitted", programme_code).await?;
        Ok(AdmittedApplicant::list(&tree)?)
    }

    /// Admitted applicants who have confirmed their place
    pub async fn get_confirmed(&self, programme_code: &str) -> CallResult<Vec<AdmittedApplicant>> {
        let tree = self.by_programme("/applicants/getConfirmed", programme_code).await?;
        Ok(AdmittedApplicant::list(&tree)?)
    }

    /// Programmes registered for this institution
    pub async fn get_programmes(&self) -> CallResult<Node> {
        self.client
            .execute("/admission/getProgrammes", ParamBlock::new(), Method::POST)
            .await
    }

    async fn by_programme(&self, path: &str, programme_code: &str) -> CallResult<Node> {
        let mut v = Validator::new();
        v.programme_code("programme_code", programme_code);
        v.finish()?;

        self.client
            .execute(
                path,
                ParamBlock::new().with("ProgrammeCode", programme_code.trim()),
                Method::POST,
            )
            .await
    }
}
