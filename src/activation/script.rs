//! Inline script execution.
//!
//! Some engines do not execute an inline script that is re-inserted into the
//! document. [`MarkerShim`] detects that: it prefixes the payload with a
//! statement setting a unique global flag, inserts it, and evaluates the
//! payload itself only if the flag stayed unset. Hosts that can tell
//! directly whether a script ran plug in their own [`ScriptExecution`].

use crate::base::consenterror::ConsentError;
use crate::base::random::generate_visitor_id;
use crate::dom::{Document, Element, ElementId};

/// Strategy for making an inline script run exactly once.
pub trait ScriptExecution: Send + Sync {
    /// Insert `script` next to `placeholder` and make sure its body runs.
    fn run_inline(
        &self,
        document: &mut dyn Document,
        placeholder: ElementId,
        script: Element,
    ) -> Result<(), ConsentError>;
}

impl<S> ScriptExecution for Box<S>
where
    S: ScriptExecution + ?Sized,
{
    fn run_inline(
        &self,
        document: &mut dyn Document,
        placeholder: ElementId,
        script: Element,
    ) -> Result<(), ConsentError> {
        (**self).run_inline(document, placeholder, script)
    }
}

/// One-shot marker flag detection.
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkerShim;

impl MarkerShim {
    fn marker() -> String {
        format!("checker__{}", generate_visitor_id())
    }
}

impl ScriptExecution for MarkerShim {
    fn run_inline(
        &self,
        document: &mut dyn Document,
        placeholder: ElementId,
        mut script: Element,
    ) -> Result<(), ConsentError> {
        let flag = Self::marker();
        let source = script.text().to_string();

        script.set_text(format!("window[\"{}\"] = true; {}", flag, source));
        document.append_sibling(placeholder, script)?;

        if !document.global_flag(&flag) {
            tracing::debug!(flag = %flag, "inline script not executed natively, evaluating");
            document.evaluate(&source)?;
        }

        Ok(())
    }
}

/// Trusts the host to execute inserted inline scripts.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeExecution;

impl ScriptExecution for NativeExecution {
    fn run_inline(
        &self,
        document: &mut dyn Document,
        placeholder: ElementId,
        script: Element,
    ) -> Result<(), ConsentError> {
        document.append_sibling(placeholder, script).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::MemoryDocument;

    fn run(native: bool) -> MemoryDocument {
        let mut doc = MemoryDocument::with_native_inline(native);
        let anchor = doc.push(Element::new("script"));
        MarkerShim
            .run_inline(
                &mut doc,
                anchor,
                Element::new("script").with_text("ga('send');"),
            )
            .unwrap();
        doc
    }

    #[test]
    fn test_runs_once_when_host_executes() {
        let doc = run(true);
        assert_eq!(doc.executed_scripts(), vec!["ga('send');".to_string()]);
    }

    #[test]
    fn test_runs_once_when_host_skips() {
        let doc = run(false);
        assert_eq!(doc.executed_scripts(), vec!["ga('send');".to_string()]);
    }

    #[test]
    fn test_markers_are_unique() {
        assert_ne!(MarkerShim::marker(), MarkerShim::marker());
    }
}
