pub(crate) mod errors;
pub(crate) mod evaluations;
pub(crate) mod exports;
pub(crate) mod handlers;
pub(crate) mod results;
pub(crate) mod router;
pub(crate) mod rubric;
pub(crate) mod session;
pub(crate) mod students;
pub(crate) mod validation;

#[cfg(test)]
mod tests;
