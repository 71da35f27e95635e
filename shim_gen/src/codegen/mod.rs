pub mod c;
pub mod c_gen;
pub mod manifest;
pub mod verify;

pub use c::{CShimGenerator, CShimGeneratorOptions};
pub use c_gen::Forwarder;
pub use manifest::{build_manifest, serialize_manifest, unit_digest, ManifestContext, ManifestFormat};
pub use verify::verify_translation_unit;

pub const DEFAULT_UNIT_FILE: &str = "extern.c";
pub const DEFAULT_MANIFEST_FILE: &str = "extern.manifest.json";
