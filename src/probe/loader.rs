use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use super::definition::{ProbeDefinition, ProbeName};

/// Read and parse `probe_json/<name>.json` for the given probe.
///
/// Mirrors `ports::load_ports_from_path`'s style: read the file, then
/// report a precise, file-path-qualified error on any failure rather than
/// letting `serde_json`'s raw error bubble up unannotated.
pub fn load_probe_definition(probe_dir: &Path, name: ProbeName) -> Result<ProbeDefinition> {
    let path = probe_json_path(probe_dir, name);
    let raw = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read probe file {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse probe file {}", path.display()))
}

fn probe_json_path(probe_dir: &Path, name: ProbeName) -> PathBuf {
    probe_dir.join(format!("{}.json", name.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn loads_and_parses_a_probe_file() {
        let dir = tempdir();
        let path = dir.join("H1-Close.json");
        let mut file = std::fs::File::create(&path).unwrap();
        write!(
            file,
            r#"{{"alpn":"http/1.1","base_content":"GET / HTTP/1.1\r\n\r\n","repeat_content":"","repeat_num":0}}"#
        )
        .unwrap();

        let def = load_probe_definition(&dir, ProbeName::H1Close).unwrap();
        assert_eq!(def.alpn, "http/1.1");
        assert_eq!(def.repeat_num, 0);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempdir();
        let err = load_probe_definition(&dir, ProbeName::H1Incomplete).unwrap_err();
        assert!(err.to_string().contains("H1-Incomplete.json"));
        std::fs::remove_dir_all(&dir).ok();
    }

    fn tempdir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "trojan-prober-test-{}-{}",
            std::process::id(),
            line!()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }
}
