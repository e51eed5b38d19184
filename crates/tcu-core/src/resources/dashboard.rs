//! Admission dashboard figures

use crate::client::TcuClient;
use crate::error::CallResult;
use crate::http::Method;
use crate::resources::validation::Validator;
use crate::xml::{Node, ParamBlock};

pub struct Dashboard<'a> {
    client: &'a TcuClient,
}

impl<'a> Dashboard<'a> {
    pub(crate) fn new(client: &'a TcuClient) -> Self {
        Self { client }
    }

    /// Report the number of male and female applicants admitted to a programme
    pub async fn populate(&self, programme_code: &str, males: u32, females: u32) -> CallResult<Node> {
        let mut v = Validator::new();
        v.programme_code("programme_code", programme_code);
        v.finish()?;

        let block = ParamBlock::new()
            .with("ProgrammeCode", programme_code.trim())
            .with("Males", males.to_string())
            .with("Females", females.to_string());
        self.client.execute("/dashboard/populate", block, Method::POST).await
    }
}
