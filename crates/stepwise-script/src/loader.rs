//! Loading a script file into a runnable target.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use stepwise_core::{Debuggee, TargetFailure, TraceHook};
use tracing::{debug, info};

use crate::ast::Program;
use crate::error::{Result, ScriptError};
use crate::interpreter::Interpreter;
use crate::parser;

/// A parsed script ready to run under a trace hook
pub struct ScriptTarget
{
    path: PathBuf,
    program: Program,
    output: Box<dyn Write + Send>,
}

impl ScriptTarget
{
    /// Read and parse the script at `path`. Its `print` output goes to
    /// `output`.
    ///
    /// # Errors
    ///
    /// Returns [`ScriptError::NotFound`] if the file does not exist,
    /// [`ScriptError::Io`] if it cannot be read, and a syntax or indentation
    /// error if it does not parse.
    pub fn load(path: impl AsRef<Path>, output: Box<dyn Write + Send>) -> Result<Self>
    {
        let path = path.as_ref();
        let path = match fs::canonicalize(path) {
            Ok(path) => path,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Err(ScriptError::NotFound(path.to_path_buf())),
            Err(source) => {
                return Err(ScriptError::Io {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        let source = fs::read_to_string(&path).map_err(|source| ScriptError::Io {
            path: path.clone(),
            source,
        })?;
        let program = parser::parse(&source)?;
        debug!("Parsed {} ({} top-level statements)", path.display(), program.body.len());

        Ok(Self { path, program, output })
    }

    /// Parse `source` as if it had been read from `path`.
    ///
    /// # Errors
    ///
    /// Returns a syntax or indentation error if `source` does not parse.
    pub fn from_source(path: impl Into<PathBuf>, source: &str, output: Box<dyn Write + Send>) -> Result<Self>
    {
        Ok(Self {
            path: path.into(),
            program: parser::parse(source)?,
            output,
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path
    {
        &self.path
    }
}

impl std::fmt::Debug for ScriptTarget
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result
    {
        f.debug_struct("ScriptTarget").field("path", &self.path).finish_non_exhaustive()
    }
}

impl Debuggee for ScriptTarget
{
    fn run(mut self, hook: &mut dyn TraceHook) -> std::result::Result<(), TargetFailure>
    {
        let file = self.path.to_string_lossy().into_owned();
        info!("Running {file}");
        let result = Interpreter::new(&file, hook, &mut *self.output).run(&self.program);
        let _ = self.output.flush();
        result
    }
}
