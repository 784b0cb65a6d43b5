//! Scripted stand-in for ffmpeg shared by the integration tests.
//!
//! The stand-in answers the encoder listing, reports progress on stderr,
//! sleeps briefly per encode and writes the output file. `c.avi` fails on the
//! high-efficiency codec only, `d.webm` fails on every codec; both leave a
//! partial output behind.

#![allow(dead_code)]

use batch720::config::{CpuConfig, EncoderConfig};
use batch720::Config;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

const FULL_LISTING: &str = "\
Encoders:
 V..... = Video
 ------
 V....D libx264              libx264 H.264 / AVC / MPEG-4 AVC (codec h264)
 V....D hevc_nvenc           NVIDIA NVENC hevc encoder (codec hevc)
 A....D aac                  AAC (Advanced Audio Coding)";

const BASELINE_LISTING: &str = "\
Encoders:
 V..... = Video
 ------
 V....D libx264              libx264 H.264 / AVC / MPEG-4 AVC (codec h264)
 A....D aac                  AAC (Advanced Audio Coding)";

pub struct FakeTools {
    pub full: PathBuf,
    pub baseline_only: PathBuf,
}

fn fake_script(listing: &str) -> String {
    format!(
        r#"#!/bin/sh
for arg in "$@"; do
  if [ "$arg" = "-encoders" ]; then
    cat <<'LIST'
{listing}
LIST
    exit 0
  fi
done
codec=""
input=""
out=""
prev=""
for arg in "$@"; do
  case "$prev" in
    -c:v) codec="$arg" ;;
    -i) input="$arg" ;;
  esac
  prev="$arg"
  out="$arg"
done
echo "encoding $(basename "$input") with $codec" >&2
sleep 0.2
case "$(basename "$input")" in
  c.avi)
    if [ "$codec" = "hevc_nvenc" ]; then
      printf partial > "$out"
      exit 1
    fi
    ;;
  d.webm)
    printf partial > "$out"
    exit 1
    ;;
esac
printf 'encoded with %s' "$codec" > "$out"
"#
    )
}

fn write_executable(path: &Path, content: &str) {
    fs::write(path, content).unwrap();
    fs::set_permissions(path, fs::Permissions::from_mode(0o755)).unwrap();
}

/// Scripts are written once, before any test spawns a process.
pub fn fake_tools() -> &'static FakeTools {
    static TOOLS: OnceLock<FakeTools> = OnceLock::new();
    TOOLS.get_or_init(|| {
        let dir = PathBuf::from(env!("CARGO_TARGET_TMPDIR"))
            .join(format!("batch720-fake-ffmpeg-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();

        let full = dir.join("ffmpeg-full");
        write_executable(&full, &fake_script(FULL_LISTING));
        let baseline_only = dir.join("ffmpeg-baseline");
        write_executable(&baseline_only, &fake_script(BASELINE_LISTING));

        FakeTools {
            full,
            baseline_only,
        }
    })
}

pub fn test_config(program: &Path, cores: u32, fraction: f32) -> Config {
    Config {
        encoder: EncoderConfig {
            program: program.to_path_buf(),
            ..EncoderConfig::default()
        },
        cpu: CpuConfig {
            logical_cores: Some(cores),
            concurrency_fraction: fraction,
        },
        ..Config::default()
    }
}

pub fn touch(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, b"source video").unwrap();
    path
}
