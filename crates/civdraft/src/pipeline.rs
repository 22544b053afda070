//! Built-in artifact pipelines.
//!
//! Both write the finalized [`BuildRequest`] to `<data_dir>/builds/<id>.json`.
//! [`CommandBuilder`] then hands that file to an external program which
//! produces the downloadable archive.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use civdraft_room::{ArtifactBuilder, BuildError, BuildRequest};

/// Stops at the JSON export; the artifact is the JSON file itself.
#[derive(Debug, Clone)]
pub struct JsonExportBuilder {
    dir: PathBuf,
}

impl JsonExportBuilder {
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        Self {
            dir: data_dir.as_ref().join("builds"),
        }
    }

    /// Where exports and build output go.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Writes the request and returns the file's path.
    pub async fn export(&self, request: &BuildRequest) -> Result<PathBuf, BuildError> {
        if !request.draft_id.is_well_formed() {
            return Err(BuildError::Failed(format!(
                "refusing to export malformed draft id {:?}",
                request.draft_id.as_str()
            )));
        }
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.dir.join(format!("{}.json", request.draft_id));
        let bytes = serde_json::to_vec_pretty(request)?;
        tokio::fs::write(&path, bytes).await?;
        tracing::debug!(draft_id = %request.draft_id, path = %path.display(), "build request exported");
        Ok(path)
    }
}

impl ArtifactBuilder for JsonExportBuilder {
    async fn build(&self, request: BuildRequest) -> Result<String, BuildError> {
        self.export(&request).await?;
        Ok(format!("{}.json", request.draft_id))
    }
}

/// Exports the request, then runs `program args.. <json path> <output dir>`.
/// A zero exit status means `<output dir>/<id>.zip` was produced.
#[derive(Debug, Clone)]
pub struct CommandBuilder {
    export: JsonExportBuilder,
    program: String,
    args: Vec<String>,
}

impl CommandBuilder {
    /// `argv[0]` is the program. Returns `None` for an empty `argv`.
    pub fn new(data_dir: impl AsRef<Path>, argv: Vec<String>) -> Option<Self> {
        let mut argv = argv.into_iter();
        let program = argv.next()?;
        Some(Self {
            export: JsonExportBuilder::new(data_dir),
            program,
            args: argv.collect(),
        })
    }
}

impl ArtifactBuilder for CommandBuilder {
    async fn build(&self, request: BuildRequest) -> Result<String, BuildError> {
        let input = self.export.export(&request).await?;
        let output = tokio::process::Command::new(&self.program)
            .args(&self.args)
            .arg(&input)
            .arg(self.export.dir())
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let last_line = stderr.lines().last().unwrap_or("").trim();
            return Err(BuildError::Failed(format!(
                "{} exited with {}: {last_line}",
                self.program, output.status
            )));
        }
        Ok(format!("{}.zip", request.draft_id))
    }
}

/// The pipeline the server runs, picked from configuration.
#[derive(Debug, Clone)]
pub enum Pipeline {
    Export(JsonExportBuilder),
    Command(CommandBuilder),
}

impl Pipeline {
    /// A command pipeline when `build_command` names a program, the JSON
    /// export otherwise.
    pub fn new(data_dir: impl AsRef<Path>, build_command: Option<Vec<String>>) -> Self {
        let command = build_command.and_then(|argv| CommandBuilder::new(&data_dir, argv));
        match command {
            Some(command) => Self::Command(command),
            None => Self::Export(JsonExportBuilder::new(data_dir)),
        }
    }
}

impl ArtifactBuilder for Pipeline {
    async fn build(&self, request: BuildRequest) -> Result<String, BuildError> {
        match self {
            Self::Export(builder) => builder.build(request).await,
            Self::Command(builder) => builder.build(request).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use civdraft_draft::{CardCatalog, Draft, Preset};
    use civdraft_protocol::DraftId;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("civdraft-pipeline-{name}-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        dir
    }

    fn request(id: &str) -> BuildRequest {
        let catalog = CardCatalog::uniform([5, 5, 5, 5, 5]);
        let draft = Draft::new(DraftId::new(id), Preset::default(), &catalog, 0).unwrap();
        BuildRequest::from_draft(&draft)
    }

    #[tokio::test]
    async fn test_json_export_writes_request_file() {
        let dir = scratch_dir("export");
        let builder = JsonExportBuilder::new(&dir);

        let artifact = builder.build(request("123")).await.unwrap();

        assert_eq!(artifact, "123.json");
        let written = std::fs::read(dir.join("builds").join("123.json")).unwrap();
        let decoded: BuildRequest = serde_json::from_slice(&written).unwrap();
        assert_eq!(decoded, request("123"));
    }

    #[tokio::test]
    async fn test_json_export_rejects_path_like_id() {
        let dir = scratch_dir("bad-id");
        let builder = JsonExportBuilder::new(&dir);
        let result = builder.build(request("../etc")).await;
        assert!(matches!(result, Err(BuildError::Failed(_))));
    }

    #[test]
    fn test_pipeline_new_picks_command_only_with_program() {
        assert!(matches!(Pipeline::new("d", None), Pipeline::Export(_)));
        assert!(matches!(Pipeline::new("d", Some(vec![])), Pipeline::Export(_)));
        assert!(matches!(
            Pipeline::new("d", Some(vec!["true".into()])),
            Pipeline::Command(_)
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_command_builder_reports_zip_on_success() {
        let dir = scratch_dir("cmd-ok");
        let builder = CommandBuilder::new(&dir, vec!["true".into()]).unwrap();
        assert_eq!(builder.build(request("55")).await.unwrap(), "55.zip");
        assert!(dir.join("builds").join("55.json").exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_command_builder_nonzero_exit_is_failure() {
        let dir = scratch_dir("cmd-fail");
        let builder = CommandBuilder::new(&dir, vec!["false".into()]).unwrap();
        let err = builder.build(request("56")).await.unwrap_err();
        assert!(matches!(err, BuildError::Failed(_)));
        assert!(err.to_string().contains("false exited"));
    }

    #[tokio::test]
    async fn test_command_builder_missing_program_is_io_error() {
        let dir = scratch_dir("cmd-missing");
        let builder = CommandBuilder::new(&dir, vec!["civdraft-no-such-program".into()]).unwrap();
        let err = builder.build(request("57")).await.unwrap_err();
        assert!(matches!(err, BuildError::Io(_)));
    }
}
