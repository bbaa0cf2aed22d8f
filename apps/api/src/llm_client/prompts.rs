// Prompt constants for resume scoring.
// The requirements text is sent as the first user part; page images follow in order.

/// Placeholder the model must use when an email or name cannot be read.
pub const UNREADABLE_PLACEHOLDER: &str = "--";

/// System instruction for resume scoring. Enforces the `{score, reason, email, name}` contract.
pub const RESUME_SCORING_SYSTEM: &str = "I'll give you a job description in the first \
    paragraph, followed by the pages of one resume as images. Read them and tell me if the \
    resume is eligible for the job, in pure JSON output only, with the structure \
    {\"score\": integer, \"reason\": string, \"email\": string, \"name\": string}. \
    The score is based on how many requirements the candidate passes: 0 for none, 100 for all. \
    For other cases, approximate the score from how many requirements are passed and their \
    weightage. Be strict in scoring. \
    The reason must be 20 to 40 words long. \
    If the email or name can't be read, give \"--\". \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences.";
