//! Instruction text for the agent-backed collaborators.
//!
//! Each instruction is followed in the prompt by the rendered input keys.
//! Structured stages must answer with one JSON object and nothing else.

pub const ANALYSIS_INSTRUCTION: &str = r#"You analyze business process descriptions.
Identify every actor, every step and the ordering between steps in the text under `extracted_text`.
Use step types: start_event, task, decision, end_event. Give each step a numeric id.
Answer with a single JSON object:
{"actors": [string], "steps": [{"id": int, "type": string, "action": string, "actor": string?, "condition": string?}], "dependencies": [{"from": int, "to": int, "label": string?}]}"#;

pub const CONVERSION_INSTRUCTION: &str = r#"You convert a process analysis into a process graph.
Use node types: start_event, end_event, task, exclusive_gateway, parallel_gateway.
Every gateway needs at least two outgoing edges; label the edges leaving a decision.
Merge trivial steps, keep one start event and at least one end event.
If `quality_assessment` is present, apply its feedback to the previous graph.
Answer with a single JSON object:
{"nodes": [{"id": string, "type": string, "label": string, "actor": string?}], "edges": [{"from": string, "to": string, "label": string?}]}"#;

/// Quality instruction; the threshold is substituted by [quality_instruction].
const QUALITY_TEMPLATE: &str = r#"You review a process graph against its source analysis.
Score each dimension between 0.0 and 1.0: completeness (every step and branch covered), clarity (readable labels), reduction (no redundant nodes), consistency (types and edges agree).
Set "approved" and "exit_loop" to true only if every score is at least {threshold}. Otherwise give concrete feedback for the next revision.
Answer with a single JSON object:
{"reasoning": string, "completeness_score": number, "clarity_score": number, "reduction_score": number, "consistency_score": number, "feedback": string, "approved": bool, "exit_loop": bool}"#;

pub const GENERATION_INSTRUCTION: &str = r#"You write Mermaid flowchart source for a process graph.
Start with `flowchart TD`. Define every node on its own line before the edges:
ID([Label]) for start and end events, ID[Label] for tasks, ID{Label} for gateways.
Write edges as `A --> B` or `A -->|label| B`. Do not use quotes, semicolons or pipes inside labels.
Answer with the flowchart source only."#;

pub const JUDGE_INSTRUCTION: &str = r#"You evaluate a finished diagram generation run.
Given the execution trace and the start of the generated diagram, score each dimension from 0 to 1:
- planning_quality_score: the overall orchestration of the stages
- tool_use_score: correct and efficient use of tools
- context_handling_score: information carried correctly between stages
- collaboration_score: handoffs and use of reviewer feedback
- output_quality_score: accuracy, usability and structure of the final diagram
overall_score is the average of the five.
Answer with a JSON object:
{"planning_quality_score": number, "tool_use_score": number, "context_handling_score": number, "collaboration_score": number, "output_quality_score": number, "overall_score": number, "strengths": [string], "weaknesses": [string], "recommendations": [string], "feedback": string}"#;

/// Quality instruction with the approval threshold filled in.
pub fn quality_instruction(threshold: f64) -> String {
  QUALITY_TEMPLATE.replace("{threshold}", &format!("{:.2}", threshold))
}
