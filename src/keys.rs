//! Store keys shared between stages.

/// Path of the process description handed to the run.
pub const SOURCE_PATH: &str = "source_path";
/// Free-text request from the user that started the run.
pub const USER_QUERY: &str = "user_query";
/// Plain text of the process description.
pub const EXTRACTED_TEXT: &str = "extracted_text";
/// Actors, steps and dependencies found in the description.
pub const PROCESS_ANALYSIS: &str = "process_analysis";
/// Node/edge structure produced inside the refinement loop.
pub const PROCESS_GRAPH: &str = "process_graph";
/// Evaluator verdict for the latest process graph.
pub const QUALITY_ASSESSMENT: &str = "quality_assessment";
/// Current flowchart source text.
pub const CURRENT_DIAGRAM: &str = "current_diagram";
/// Graph validator report for the current diagram.
pub const VALIDATION_RESULT: &str = "validation_result";
/// The approval record.
pub const APPROVAL_STATUS: &str = "approval_status";
/// Message left by the publication stage.
pub const PUBLICATION_RESULT: &str = "publication_result";
