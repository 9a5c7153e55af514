//! The Postgres implementation of the store traits.
//!
//! Every `*Store` trait in [`crate::core`] is implemented for `Repository<&mut Tx>`
//! next to the trait itself, so one value can serve a whole service call inside
//! a single database transaction.

/// A repository backed by some executor, usually `&mut Tx`.
#[derive(Debug)]
pub struct Repository<E> {
    pub(crate) executor: E,
}

impl<E> Repository<E> {
    /// Creates a new repository.
    pub fn new(executor: E) -> Self {
        Self { executor }
    }
}

/// Escapes `%`, `_` and `\` so user input matches literally inside `LIKE`.
pub(crate) fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
