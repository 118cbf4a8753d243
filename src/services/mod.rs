pub(crate) mod evaluation;
pub(crate) mod export;
pub(crate) mod gemini;
pub(crate) mod normalizer;
pub(crate) mod prompt;
