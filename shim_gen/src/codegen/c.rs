use crate::codegen::c_gen::{emit_forwarder, emit_includes, Forwarder, WRAPPERS_MARKER};
use rayon::prelude::*;

pub struct CShimGenerator {
    options: CShimGeneratorOptions,
}

pub struct CShimGeneratorOptions {
    /* Render forwarders on the rayon pool; output is identical either way */
    pub parallel: bool,
    pub emit_marker: bool,
}

impl Default for CShimGeneratorOptions {
    fn default() -> Self {
        Self {
            parallel: false,
            emit_marker: true,
        }
    }
}

impl CShimGenerator {
    pub fn new(options: CShimGeneratorOptions) -> Self {
        Self { options }
    }

    /// Build the translation unit: includes, the marker line, then one
    /// forwarder per line in the order given.
    pub fn emit_code(&self, headers: &[String], forwarders: &[Forwarder]) -> String {
        let lines: Vec<String> = if self.options.parallel {
            forwarders.par_iter().map(emit_forwarder).collect()
        } else {
            forwarders.iter().map(emit_forwarder).collect()
        };

        let mut output = emit_includes(headers);
        if self.options.emit_marker {
            output.push('\n');
            output.push_str(WRAPPERS_MARKER);
            output.push_str("\n\n");
        } else if !output.is_empty() {
            output.push('\n');
        }
        for line in &lines {
            output.push_str(line);
        }
        output
    }
}
