//! End-to-end tests of a whole session live in `tests/`.
