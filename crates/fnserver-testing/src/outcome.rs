use std::fmt;

use serde::Serialize;

/// One field whose staged value differs from the expectation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mismatch {
    pub field: String,
    pub want: String,
    pub got: String,
}

impl Mismatch {
    pub fn new<T: Serialize + ?Sized>(field: &str, want: &T, got: &T) -> Self {
        Self {
            field: field.to_string(),
            want: render(want),
            got: render(got),
        }
    }
}

fn render<T: Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|e| format!("<unrenderable: {e}>"))
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}: -want +got", self.field)?;
        for line in self.want.lines() {
            writeln!(f, "- {line}")?;
        }
        for line in self.got.lines() {
            writeln!(f, "+ {line}")?;
        }
        Ok(())
    }
}

/// Result of running a [`crate::FunctionTest`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TestOutcome {
    mismatches: Vec<Mismatch>,
}

impl TestOutcome {
    pub fn new(mismatches: Vec<Mismatch>) -> Self {
        Self { mismatches }
    }

    pub fn is_success(&self) -> bool {
        self.mismatches.is_empty()
    }

    pub fn mismatches(&self) -> &[Mismatch] {
        &self.mismatches
    }

    /// Panic listing every mismatch, if there is any.
    #[track_caller]
    pub fn assert_success(&self) {
        if !self.is_success() {
            panic!("function test failed:\n{self}");
        }
    }
}

impl fmt::Display for TestOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for mismatch in &self.mismatches {
            write!(f, "{mismatch}")?;
        }
        Ok(())
    }
}
