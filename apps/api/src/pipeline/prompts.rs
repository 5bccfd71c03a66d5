// Prompt constants for the structured tasks.
// Placeholders are `{name}`; `compiler::render` fills them in a single pass,
// so caller text containing braces is never re-expanded.

/// System prompt for candidate ranking.
pub const RANKING_SYSTEM: &str = "You are an expert HR manager ranking candidates against a job description. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Ranking prompt template.
/// Replace: {job_title}, {job_description}, {candidate_list}, {count_instruction}, {closing}
pub const RANKING_PROMPT_TEMPLATE: &str = r#"You are ranking candidates based on their resume text and a job description.

Job Title: {job_title}
Job Description: {job_description}

Candidate Data:
{candidate_list}

Instructions:
1. Read each resume carefully.
2. Rank candidates by their fit for the job requirements.
3. {count_instruction}
4. Use the exact Candidate IDs provided above in your response. Do NOT invent IDs.
5. List at least one concern for every candidate. No candidate is a perfect fit.
6. fit_score is an integer from 1 (poor fit) to 10 (excellent fit).

Respond with ONLY this JSON structure:
{
  "top_candidates": [
    {
      "candidate_id": "string",
      "candidate_name": "string",
      "fit_score": 7,
      "strengths": ["strength1", "strength2", "strength3"],
      "concerns": ["concern1", "concern2"],
      "technical_skills": ["skill1", "skill2"],
      "reasoning": "1-2 sentence explanation of ranking"
    }
  ]
}

Order candidates from best to worst fit. {closing}"#;

/// One candidate block in the ranking prompt.
/// Replace: {opaque_id}, {display_name}, {resume_text}
pub const RANKING_CANDIDATE_TEMPLATE: &str = r#"- Candidate ID: {opaque_id} | Name: {display_name}
Resume:
{resume_text}
"#;

/// Appended to the ranking prompt when the recruiter left comments.
/// Replace: {comments}
pub const RANKING_COMMENTS_TEMPLATE: &str = "\n\nAdditional Comments: {comments}";

/// System prompt for conversation extraction.
pub const CONVERSATION_SYSTEM: &str = "You are an expert recruiting coordinator extracting facts \
    from a conversation between a recruiter and a candidate. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences.";

/// Conversation extraction prompt template.
/// Replace: {no_inference}, {transcript}
pub const CONVERSATION_PROMPT_TEMPLATE: &str = r#"{no_inference}

Extract the following from the conversation below and return a JSON object with this EXACT schema:
{
  "start_date": "YYYY-MM-DD or null",
  "end_date": "YYYY-MM-DD or null",
  "min_salary": 90000,
  "max_salary": 120000,
  "interest_level": 4,
  "summary_text": "2-3 sentence neutral summary of the conversation"
}

Rules:
- Dates MUST use the YYYY-MM-DD format. Use null if no concrete date was stated.
- Salaries MUST be plain numbers (no currency symbols, no "k" suffix). Use null if not discussed.
- interest_level is an integer from 1 (not interested) to 5 (very interested), or null if unclear.
- summary_text summarizes what was actually said.

CONVERSATION:
{transcript}"#;

/// System prompt for bias detection.
pub const BIAS_SYSTEM: &str = "You are an expert in fair hiring practices reviewing interview feedback \
    for biased or non-job-related language. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences.";

/// Bias detection prompt template.
/// Replace: {no_inference}, {feedback}
pub const BIAS_PROMPT_TEMPLATE: &str = r#"{no_inference}

Review the interview feedback below. Flag terms or phrases that reference protected characteristics
(age, gender, race, ethnicity, religion, disability, family status, national origin) or that judge
the candidate on criteria unrelated to the job.

Return a JSON object with this EXACT schema:
{
  "flags": [
    {"term": "exact phrase from the feedback", "justification": "why this phrase may indicate bias"}
  ]
}

Quote each term exactly as it appears in the feedback.
If no bias is found, return {"flags": []}.

FEEDBACK:
{feedback}"#;
