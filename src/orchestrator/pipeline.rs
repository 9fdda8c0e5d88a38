//! End-to-end question answering over one document

use super::runner::{AnswerReport, RequestOrchestrator};
use super::sink::AnswerSink;
use crate::config::Config;
use crate::context::{ChunkPlan, ChunkPlanner, PromptFrame, TiktokenTokenizer, TokenBudget};
use crate::error::{QaError, Result};
use crate::extract::Document;
use crate::llm::{ApiCredential, CompletionClient};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, info_span, Instrument};
use uuid::Uuid;

/// Extract → plan → orchestrate
pub struct QaPipeline {
    planner: ChunkPlanner,
    frame: PromptFrame,
    budget: TokenBudget,
    orchestrator: RequestOrchestrator,
}

impl QaPipeline {
    /// Build the pipeline from configuration and an injected credential
    ///
    /// Fails with a configuration error on an invalid budget, before any
    /// request can be made.
    pub fn new(config: &Config, credential: ApiCredential) -> Result<Self> {
        let budget = config.budget()?;
        let tokenizer = TiktokenTokenizer::new(config.planner.encoding)?;
        let planner = ChunkPlanner::new(
            Arc::new(tokenizer),
            config.planner.policy,
            config.planner.question_placement,
        );
        let client = CompletionClient::new(config.completion.clone(), credential)?;

        Ok(Self::from_parts(
            planner,
            config.planner.frame(),
            budget,
            RequestOrchestrator::new(client),
        ))
    }

    pub fn from_parts(
        planner: ChunkPlanner,
        frame: PromptFrame,
        budget: TokenBudget,
        orchestrator: RequestOrchestrator,
    ) -> Self {
        Self {
            planner,
            frame,
            budget,
            orchestrator,
        }
    }

    /// Use an externally owned cancellation token
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.orchestrator = self.orchestrator.with_cancellation(cancel);
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.orchestrator.cancellation_token()
    }

    pub fn budget(&self) -> &TokenBudget {
        &self.budget
    }

    /// Extract the document and plan its chunks without sending anything
    pub fn plan(&self, document: &Document, question: &str) -> Result<ChunkPlan> {
        if question.trim().is_empty() {
            return Err(QaError::EmptyQuestion);
        }

        let text = document.text()?;
        let input = self.frame.combine(&text, question);
        self.planner.plan(&input, &self.budget)
    }

    /// Answer `question` about `document`, streaming into `sink`
    pub async fn answer(
        &self,
        document: &Document,
        question: &str,
        sink: &mut dyn AnswerSink,
    ) -> Result<AnswerReport> {
        let run_id = Uuid::new_v4();
        let span = info_span!("answer", %run_id);

        async move {
            info!(
                "Answering over {} bytes of {:?}, question of {} chars",
                document.bytes.len(),
                document.format,
                question.chars().count()
            );

            let plan = self.plan(document, question)?;
            let report = self.orchestrator.run(&plan, sink).await;

            if report.cancelled {
                return Err(QaError::Cancelled);
            }
            Ok(report)
        }
        .instrument(span)
        .await
    }
}
