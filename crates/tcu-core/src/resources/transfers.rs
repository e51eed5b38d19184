//! Programme transfers within and between institutions

use serde::{Deserialize, Serialize};

use crate::client::TcuClient;
use crate::error::CallResult;
use crate::http::Method;
use crate::resources::response_records;
use crate::resources::validation::Validator;
use crate::xml::{Node, NodeError, ParamBlock, ParamBlocks};

/// Move of one applicant from one programme to another
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    pub f4indexno: String,
    #[serde(default)]
    pub f6indexno: Option<String>,
    pub current_programme_code: String,
    pub previous_programme_code: String,
}

impl Transfer {
    fn validate(&self, v: &mut Validator, prefix: &str) {
        let field = |name: &str| format!("{}{}", prefix, name);
        v.f4_index(&field("f4indexno"), &self.f4indexno)
            .optional(self.f6indexno.as_deref(), |v, s| {
                v.f6_index(&field("f6indexno"), s);
            })
            .programme_code(&field("current_programme_code"), &self.current_programme_code)
            .programme_code(&field("previous_programme_code"), &self.previous_programme_code);
    }

    fn to_block(&self) -> ParamBlock {
        let mut block = ParamBlock::new().with("f4indexno", self.f4indexno.trim());
        block.insert_opt("f6indexno", self.f6indexno.as_deref());
        block
            .with("CurrentProgrammeCode", self.current_programme_code.trim())
            .with("PreviousProgrammeCode", self.previous_programme_code.trim())
    }
}

/// Provider verdict on one submitted transfer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferStatus {
    pub f4indexno: String,
    pub status_code: Option<String>,
    pub description: Option<String>,
}

impl TransferStatus {
    pub fn from_node(node: &Node) -> Result<Self, NodeError> {
        Ok(Self {
            f4indexno: node.text("f4indexno")?.to_string(),
            status_code: node.opt_text("StatusCode")?.map(str::to_string),
            description: node.opt_text("StatusDescription")?.map(str::to_string),
        })
    }
}

pub struct Transfers<'a> {
    client: &'a TcuClient,
}

impl<'a> Transfers<'a> {
    pub(crate) fn new(client: &'a TcuClient) -> Self {
        Self { client }
    }

    /// Transfers between programmes of this institution
    pub async fn submit_internal(&self, transfers: &[Transfer]) -> CallResult<Node> {
        self.submit("/admission/submitInternalTransfers", transfers).await
    }

    /// Transfers into this institution from another one
    pub async fn submit_inter_institutional(&self, transfers: &[Transfer]) -> CallResult<Node> {
        self.submit("/admission/submitInterInstitutionalTransfers", transfers)
            .await
    }

    pub async fn internal_status(&self, programme_code: &str) -> CallResult<Vec<TransferStatus>> {
        self.status("/admission/getInternalTransferStatus", programme_code)
            .await
    }

    pub async fn inter_institutional_status(&self, programme_code: &str) -> CallResult<Vec<TransferStatus>> {
        self.status("/admission/getInterInstitutionalTransferStatus", programme_code)
            .await
    }

    async fn submit(&self, path: &str, transfers: &[Transfer]) -> CallResult<Node> {
        let mut v = Validator::new();
        v.non_empty("transfers", transfers);
        for (i, transfer) in transfers.iter().enumerate() {
            transfer.validate(&mut v, &format!("transfers[{}].", i));
        }
        v.finish()?;

        let blocks: Vec<ParamBlock> = transfers.iter().map(Transfer::to_block).collect();
        self.client
            .execute(path, ParamBlocks::from(blocks), Method::POST)
            .await
    }

    async fn status(&self, path: &str, programme_code: &str) -> CallResult<Vec<TransferStatus>> {
        let mut v = Validator::new();
        v.programme_code("programme_code", programme_code);
        v.finish()?;

        let tree = self
            .client
            .execute(
                path,
                ParamBlock::new().with("ProgrammeCode", programme_code.trim()),
                Method::POST,
            )
            .await?;
        let statuses = response_records(&tree, Some("Applicant"))?
            .into_iter()
            .map(TransferStatus::from_node)
            .collect::<Result<_, _>>()?;
        Ok(statuses)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transfer_block_order() {
        let transfer = Transfer {
            f4indexno: "S0123/0001/2019".into(),
            f6indexno: None,
            current_programme_code: "UD023".into(),
            previous_programme_code: "UD010".into(),
        };
        let block = transfer.to_block();
        let names: Vec<&str> = block.fields().iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(names, ["f4indexno", "CurrentProgrammeCode", "PreviousProgrammeCode"]);
    }

    #[test]
    fn test_transfer_validation() {
        let transfer = Transfer {
            f4indexno: "S0123/0001/2019".into(),
            f6indexno: Some("bad".into()),
            current_programme_code: "UD023".into(),
            previous_programme_code: "??".into(),
        };
        let mut v = Validator::new();
        transfer.validate(&mut v, "transfers[0].");
        let errors = v.finish().unwrap_err();
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, ["transfers[0].f6indexno", "transfers[0].previous_programme_code"]);
    }
}
