//! Stage functions and the ordered stage descriptor list
//!
//! Each stage function fixes a system instruction, composes the user message
//! from its inputs and delegates to an `AgentInvoker`. None of them touch
//! local state.

use crate::agent::{AgentInvoker, InvokeError};
use crate::config::StageModels;
use crate::pipeline::prompts::{self, OutputLanguage};
use crate::pipeline::stage::StageKind;

/// Phase 1: critique and refine the raw idea
pub async fn evaluate_idea(
    invoker: &dyn AgentInvoker,
    model: &str,
    idea: &str,
) -> Result<String, InvokeError> {
    invoker
        .invoke(
            model,
            prompts::EVALUATION_SYSTEM,
            &prompts::evaluation_message(idea),
        )
        .await
}

/// Phase 2: modules and flow-based requirements from the refined concept
pub async fn analyze_concept(
    invoker: &dyn AgentInvoker,
    model: &str,
    refined_concept: &str,
) -> Result<String, InvokeError> {
    invoker
        .invoke(
            model,
            prompts::ANALYSIS_SYSTEM,
            &prompts::analysis_message(refined_concept),
        )
        .await
}

/// Phase 3: stack, schema and integration design from the analysis
pub async fn architect_system(
    invoker: &dyn AgentInvoker,
    model: &str,
    analysis: &str,
) -> Result<String, InvokeError> {
    invoker
        .invoke(
            model,
            prompts::ARCHITECTURE_SYSTEM,
            &prompts::architecture_message(analysis),
        )
        .await
}

/// Phase 4: structure, security and delivery phases from the architecture
pub async fn strategize_implementation(
    invoker: &dyn AgentInvoker,
    model: &str,
    architecture: &str,
) -> Result<String, InvokeError> {
    invoker
        .invoke(
            model,
            prompts::STRATEGY_SYSTEM,
            &prompts::strategy_message(architecture),
        )
        .await
}

/// Everything the Synthesis stage combines
#[derive(Debug, Clone, Copy)]
pub struct SynthesisInputs<'a> {
    /// The user's original idea
    pub idea: &'a str,
    /// Evaluation output
    pub refined_concept: &'a str,
    /// Analysis output
    pub analysis: &'a str,
    /// Architecture output
    pub architecture: &'a str,
    /// Strategy output
    pub strategy: &'a str,
}

/// Phase 5: the final ten-section document
pub async fn synthesize_document(
    invoker: &dyn AgentInvoker,
    model: &str,
    inputs: SynthesisInputs<'_>,
    language: OutputLanguage,
) -> Result<String, InvokeError> {
    invoker
        .invoke(
            model,
            &prompts::synthesis_system(language),
            &prompts::synthesis_message(
                inputs.idea,
                inputs.refined_concept,
                inputs.analysis,
                inputs.architecture,
                inputs.strategy,
            ),
        )
        .await
}

/// Inputs available to a stage: the idea, the language and every earlier output
#[derive(Debug, Clone, Copy)]
pub struct StageInputs<'a> {
    /// The user's original idea
    pub idea: &'a str,
    /// Output language for the final document
    pub language: OutputLanguage,
    /// Outputs of the stages that already completed, in order
    pub prior_outputs: &'a [String],
}

impl<'a> StageInputs<'a> {
    fn output_of(&self, kind: StageKind) -> &'a str {
        self.prior_outputs
            .get(kind.index())
            .map(String::as_str)
            .unwrap_or_default()
    }
}

/// One entry of the fixed pipeline: which stage, which model, and progress text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageDescriptor {
    /// Stage identity
    pub kind: StageKind,
    /// Upstream model bound to the stage
    pub model: String,
}

impl StageDescriptor {
    /// Log line recorded when the stage starts
    pub fn start_log(&self) -> &'static str {
        match self.kind {
            StageKind::Evaluation => {
                "Deconstructing the idea and simulating the user lifecycle..."
            }
            StageKind::Analysis => "Analyzing data flow and business logic...",
            StageKind::Architecture => "Designing the system architecture and database...",
            StageKind::Strategy => "Planning implementation and security...",
            StageKind::Synthesis => "Writing the academic system prompt...",
        }
    }

    /// Log line recorded when the stage completes
    pub fn done_log(&self) -> &'static str {
        match self.kind {
            StageKind::Evaluation => "Concept restructuring complete.",
            StageKind::Analysis => "Technical specification complete.",
            StageKind::Architecture => "Architecture design complete.",
            StageKind::Strategy => "Development strategy complete.",
            StageKind::Synthesis => "Done.",
        }
    }

    /// Run this stage's function with inputs taken from `inputs`
    ///
    /// Analysis, Architecture and Strategy read the output of the stage right
    /// before them; Synthesis reads the idea and all four earlier outputs.
    pub async fn run(
        &self,
        invoker: &dyn AgentInvoker,
        inputs: StageInputs<'_>,
    ) -> Result<String, InvokeError> {
        let model = self.model.as_str();
        match self.kind {
            StageKind::Evaluation => evaluate_idea(invoker, model, inputs.idea).await,
            StageKind::Analysis => {
                analyze_concept(invoker, model, inputs.output_of(StageKind::Evaluation)).await
            }
            StageKind::Architecture => {
                architect_system(invoker, model, inputs.output_of(StageKind::Analysis)).await
            }
            StageKind::Strategy => {
                strategize_implementation(
                    invoker,
                    model,
                    inputs.output_of(StageKind::Architecture),
                )
                .await
            }
            StageKind::Synthesis => {
                let synthesis_inputs = SynthesisInputs {
                    idea: inputs.idea,
                    refined_concept: inputs.output_of(StageKind::Evaluation),
                    analysis: inputs.output_of(StageKind::Analysis),
                    architecture: inputs.output_of(StageKind::Architecture),
                    strategy: inputs.output_of(StageKind::Strategy),
                };
                synthesize_document(invoker, model, synthesis_inputs, inputs.language).await
            }
        }
    }
}

/// The five stages in execution order, bound to the configured models
pub fn pipeline_stages(models: &StageModels) -> Vec<StageDescriptor> {
    StageKind::ALL
        .iter()
        .map(|kind| StageDescriptor {
            kind: *kind,
            model: models.for_stage(*kind).to_string(),
        })
        .collect()
}
