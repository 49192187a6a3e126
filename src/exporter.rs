//! Companion exporter invocation via a container engine.
//!
//! The Ruby-based exporter ships as a container image. This module wraps
//! the build-and-run sequence: `<engine> build -t <image> <context>`
//! followed by `<engine> run --rm -v <store>:/export <image> [args...]`.
//! Engine output is inherited so build logs stay visible to the operator.

use camino::Utf8PathBuf;
use tokio::process::Command;

use crate::bitbucket::error::ExportError;

/// Mount point for the export store inside the container.
const CONTAINER_EXPORT_PATH: &str = "/export";

/// Everything needed to build and run the exporter container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExporterSpec {
    /// Container engine binary, e.g. `docker` or `podman`.
    pub engine: String,
    /// Image tag to build and run.
    pub image: String,
    /// Build context directory containing the exporter's Dockerfile.
    pub context: Utf8PathBuf,
    /// Export store root mounted into the container.
    pub store_root: Utf8PathBuf,
    /// Extra arguments passed to the container entrypoint.
    pub args: Vec<String>,
}

/// Builds and runs the companion exporter container.
pub struct ContainerExporter {
    spec: ExporterSpec,
}

impl ContainerExporter {
    /// Creates a runner for the given exporter spec.
    #[must_use]
    pub const fn new(spec: ExporterSpec) -> Self {
        Self { spec }
    }

    /// Runs `build` then `run`, propagating a non-zero exit as an error.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError::Exporter`] when the engine cannot be
    /// launched or either step exits non-zero.
    pub async fn run(&self) -> Result<(), ExportError> {
        self.execute(
            "build",
            &[
                "build".to_owned(),
                "-t".to_owned(),
                self.spec.image.clone(),
                self.spec.context.to_string(),
            ],
        )
        .await?;

        let mut run_args = vec![
            "run".to_owned(),
            "--rm".to_owned(),
            "-v".to_owned(),
            format!("{}:{CONTAINER_EXPORT_PATH}", self.spec.store_root),
            self.spec.image.clone(),
        ];
        run_args.extend(self.spec.args.iter().cloned());

        self.execute("run", &run_args).await
    }

    async fn execute(&self, step: &str, args: &[String]) -> Result<(), ExportError> {
        tracing::debug!(engine = %self.spec.engine, step, "invoking container engine");

        let status = Command::new(&self.spec.engine)
            .args(args)
            .status()
            .await
            .map_err(|error| ExportError::Exporter {
                message: format!(
                    "failed to launch '{engine}' for exporter {step}: {error}",
                    engine = self.spec.engine
                ),
                exit_code: None,
            })?;

        if status.success() {
            return Ok(());
        }

        Err(ExportError::Exporter {
            message: format!("exporter {step} exited with {status}"),
            exit_code: status.code(),
        })
    }
}

#[cfg(test)]
mod tests {
    use camino::Utf8PathBuf;

    use super::{ContainerExporter, ExporterSpec};
    use crate::bitbucket::error::ExportError;

    fn spec_with_engine(engine: &str) -> ExporterSpec {
        ExporterSpec {
            engine: engine.to_owned(),
            image: "bbexport/exporter:latest".to_owned(),
            context: Utf8PathBuf::from("exporter"),
            store_root: Utf8PathBuf::from("/tmp/export"),
            args: Vec::new(),
        }
    }

    #[tokio::test]
    async fn succeeds_when_both_steps_exit_zero() {
        // `true` ignores its arguments and exits 0, standing in for the engine.
        let exporter = ContainerExporter::new(spec_with_engine("true"));
        exporter.run().await.expect("run should succeed");
    }

    #[tokio::test]
    async fn non_zero_exit_surfaces_the_step_and_code() {
        let exporter = ContainerExporter::new(spec_with_engine("false"));
        let result = exporter.run().await;

        let Err(ExportError::Exporter { message, exit_code }) = result else {
            panic!("expected exporter error, got {result:?}");
        };
        assert!(message.contains("build"));
        assert_eq!(exit_code, Some(1));
    }

    #[tokio::test]
    async fn missing_engine_reports_a_launch_failure() {
        let exporter =
            ContainerExporter::new(spec_with_engine("bbexport-no-such-engine-binary"));
        let result = exporter.run().await;

        assert!(matches!(
            result,
            Err(ExportError::Exporter { exit_code: None, .. })
        ));
    }
}
