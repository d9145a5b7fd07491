use crate::error::Result;
use crate::ingestion::statement_from_model_response;
use crate::llm::client::{OllamaClient, QueryOptions};
use crate::schema::{RawStatement, StatementSchema};
use crate::{FlowReport, IncomeFlowProcessor};
use log::debug;

/// Asks a local model to pull the six income statement figures out of document text.
pub struct StatementExtractor {
    client: OllamaClient,
    options: QueryOptions,
}

impl StatementExtractor {
    pub fn new(client: OllamaClient) -> Self {
        Self {
            client,
            options: QueryOptions::default(),
        }
    }

    pub fn with_options(mut self, options: QueryOptions) -> Self {
        self.options = options;
        self
    }

    pub fn build_prompt(document_text: &str) -> Result<String> {
        let schema = StatementSchema::schema_as_json()?;
        Ok(format!(
            "Extract the income statement figures from the document below.\n\
            Return a single JSON object matching this JSON Schema:\n\
            {}\n\n\
            Rules:\n\
            1. Copy numbers exactly as printed, including currency symbols and separators.\n\
            2. Use the string \"Unknown\" for any figure the document does not state.\n\
            3. Do not calculate missing figures.\n\
            4. If the document contains no income statement, return {{\"error\": \"<reason>\"}}.\n\n\
            DOCUMENT:\n{}",
            schema, document_text
        ))
    }

    pub async fn extract(&self, document_text: &str) -> Result<RawStatement> {
        let prompt = Self::build_prompt(document_text)?;
        let response = self.client.query(&prompt, &self.options).await?;
        debug!("Model returned {} chars", response.len());
        statement_from_model_response(&response)
    }

    /// Extraction followed by the full flow pipeline.
    pub async fn extract_flow_report(
        &self,
        document_text: &str,
        processor: &IncomeFlowProcessor,
    ) -> Result<FlowReport> {
        let statement = self.extract(document_text).await?;
        processor.process(Some(&statement))
    }
}
