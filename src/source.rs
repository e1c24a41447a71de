//! Loading PL/0 source text.

use std::fs;
use std::path::{Path, PathBuf};

use snafu::{ResultExt, ensure};

use crate::error::{BadExtensionSnafu, CompileResult, ReadSourceSnafu};

/// Extension every source file must carry.
pub const EXTENSION: &str = "pl0";

/// Source text together with the name it was loaded from.
#[derive(Debug, Clone)]
pub struct SourceFile {
  path: PathBuf,
  text: String,
}

impl SourceFile {
  /// Read a whole `.pl0` file into memory.
  pub fn read(path: impl AsRef<Path>) -> CompileResult<Self> {
    let path = path.as_ref();
    ensure!(
      path.extension().is_some_and(|ext| ext == EXTENSION),
      BadExtensionSnafu { path }
    );
    let text = fs::read_to_string(path).context(ReadSourceSnafu { path })?;
    Ok(Self {
      path: path.to_path_buf(),
      text,
    })
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  pub fn text(&self) -> &str {
    &self.text
  }
}
