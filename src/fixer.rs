//! External-Fix Bridge
//!
//! Round-trips document text through the external fixer binary: write the
//! content to a scoped temp file, run `<fixer> fix <path>`, read the rewritten
//! file back. The fixer's style rules are its own business; this module only
//! owns the plumbing.

use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;

use crate::config::Settings;
use crate::error::FixError;

/// Language id the bridge accepts without any configuration
pub const PRIMARY_LANGUAGE_ID: &str = "abap";

/// Opening tag the fixer needs to see before it touches a file. Synthesized
/// for selections that lack it and stripped back out of the result.
pub const ABAP_OPEN_TAG: &str = "<?abap\n";

/// Prefix for the per-invocation temp files
const TEMP_FILE_PREFIX: &str = "abapfmt-";

/// Fail fast when the document type is not fixable. Nothing is written and
/// no process is spawned for unsupported documents.
pub fn check_applicability(language_id: &str, additional_extensions: &[String]) -> Result<(), FixError> {
    if language_id == PRIMARY_LANGUAGE_ID
        || additional_extensions.iter().any(|ext| ext == language_id)
    {
        Ok(())
    } else {
        Err(FixError::UnsupportedLanguage(language_id.to_string()))
    }
}

/// One configured invocation target for the external fixer
#[derive(Debug, Clone)]
pub struct ExternalFixer {
    command: String,
    timeout_secs: u64,
}

impl ExternalFixer {
    pub fn new(command: impl Into<String>, timeout_secs: u64) -> Self {
        Self {
            command: command.into(),
            timeout_secs,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.fixer_command.clone(), settings.fixer_timeout_secs)
    }

    /// Run the fixer over `content` and return the rewritten text.
    ///
    /// The temp file is removed on every exit path by its RAII guard. If the
    /// content has no `<?` opening tag, one is synthesized before the write
    /// and stripped from the read-back, so the returned text never contains
    /// it.
    pub async fn fix(&self, content: &str) -> Result<String, FixError> {
        let prepended_tag = !content.contains("<?");
        let content_to_fix = if prepended_tag {
            log::debug!("No ABAP opening tag found, prepending one");
            format!("{ABAP_OPEN_TAG}{content}")
        } else {
            content.to_string()
        };

        let temp_file = tempfile::Builder::new()
            .prefix(TEMP_FILE_PREFIX)
            .suffix(".abap")
            .tempfile()?;
        let temp_path = temp_file.path().to_path_buf();
        log::debug!("Writing content to temp file: {}", temp_path.display());

        tokio::fs::write(&temp_path, content_to_fix.as_bytes()).await?;

        // The path goes in as a single argv element, so embedded whitespace
        // needs no quoting and no shell is involved.
        let child = Command::new(&self.command)
            .arg("fix")
            .arg(&temp_path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| FixError::Spawn {
                command: self.command.clone(),
                source,
            })?;

        let output = tokio::time::timeout(
            Duration::from_secs(self.timeout_secs),
            child.wait_with_output(),
        )
        .await
        .map_err(|_| FixError::TimedOut(self.timeout_secs))??;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stdout.is_empty() {
            log::debug!("Fixer stdout: {stdout}");
        }
        if !stderr.is_empty() {
            log::debug!("Fixer stderr: {stderr}");
        }

        if !output.status.success() {
            return Err(FixError::FixerFailed {
                code: output.status.code(),
                stderr: stderr.trim().to_string(),
            });
        }

        let fixed = tokio::fs::read_to_string(&temp_path).await?;

        Ok(if prepended_tag {
            strip_synthesized_tag(&fixed)
        } else {
            fixed
        })
    }
}

/// Remove the synthesized opening tag from fixed content.
///
/// Normally the fixer leaves the tag byte-for-byte intact and a prefix strip
/// suffices; if it rewrote the head of the file, drop the same number of
/// characters instead.
fn strip_synthesized_tag(fixed: &str) -> String {
    if let Some(rest) = fixed.strip_prefix(ABAP_OPEN_TAG) {
        return rest.to_string();
    }
    fixed.chars().skip(ABAP_OPEN_TAG.chars().count()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_applicability_primary_language() {
        assert!(check_applicability("abap", &[]).is_ok());
    }

    #[test]
    fn test_applicability_additional_extension() {
        let extra = vec!["sap_abap".to_string()];
        assert!(check_applicability("sap_abap", &extra).is_ok());
    }

    #[test]
    fn test_applicability_rejects_unknown_language() {
        let err = check_applicability("rust", &[]).unwrap_err();
        assert!(matches!(err, FixError::UnsupportedLanguage(id) if id == "rust"));
    }

    #[test]
    fn test_rejection_message_names_the_config_key() {
        let err = check_applicability("rust", &[]).unwrap_err();
        // The key the message points at must be the one the config accepts
        assert!(err.to_string().contains("additional_extensions"));
    }

    #[test]
    fn test_strip_synthesized_tag_exact_prefix() {
        let fixed = format!("{ABAP_OPEN_TAG}field1 = 1.");
        assert_eq!(strip_synthesized_tag(&fixed), "field1 = 1.");
    }

    #[test]
    fn test_strip_synthesized_tag_rewritten_head() {
        // Same length, different case: still exactly the tag's span dropped
        assert_eq!(strip_synthesized_tag("<?ABAP\nx = 1."), "x = 1.");
    }

    // The tests below use harmless system commands as stand-in fixers: they
    // accept the `fix <path>` arguments, exit, and leave the file untouched.

    #[tokio::test]
    async fn test_fix_synthesizes_and_strips_tag() {
        let fixer = ExternalFixer::new("true", 5);
        let result = fixer.fix("field1 = 1.").await.expect("fix succeeds");
        assert_eq!(result, "field1 = 1.");
        assert!(!result.contains("<?abap"));
    }

    #[tokio::test]
    async fn test_fix_keeps_existing_tag() {
        let fixer = ExternalFixer::new("true", 5);
        let content = "<?abap\nfield1 = 1.";
        let result = fixer.fix(content).await.expect("fix succeeds");
        assert_eq!(result, content);
    }

    #[tokio::test]
    async fn test_nonzero_exit_is_surfaced() {
        let fixer = ExternalFixer::new("false", 5);
        let err = fixer.fix("x = 1.").await.unwrap_err();
        assert!(matches!(err, FixError::FixerFailed { .. }));
    }

    #[tokio::test]
    async fn test_spawn_failure_is_surfaced() {
        let fixer = ExternalFixer::new("/nonexistent/abap-fixer-binary", 5);
        let err = fixer.fix("x = 1.").await.unwrap_err();
        assert!(matches!(err, FixError::Spawn { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_timeout_kills_slow_fixer() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().expect("create temp dir");
        let script = dir.path().join("slow-fixer.sh");
        std::fs::write(&script, "#!/bin/sh\nsleep 10\n").expect("write script");
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755))
            .expect("chmod script");

        let fixer = ExternalFixer::new(script.to_string_lossy(), 1);
        let err = fixer.fix("x = 1.").await.unwrap_err();
        assert!(matches!(err, FixError::TimedOut(1)));
    }
}
