//! Encryption oracle backed by an external cipher binary
//!
//! The search core never encrypts anything. To confirm a characteristic
//! empirically, blocks are handed to a separately supplied cipher program:
//!
//! 1. plaintext (and optional key) words are written to temporary files as
//!    2-byte little-endian words,
//! 2. `<exe> e <sbox> <plaintext> <ciphertext> [key]` is run and fed a
//!    carriage return on stdin,
//! 3. the ciphertext file is read back once the process exits.
//!
//! In debug mode the program is invoked with `e*`, its output is passed
//! through and the temporary files are kept for inspection.

pub mod estimate;

pub use estimate::{DifferentialEstimate, estimate_differential};

use crate::error::{DiffError, Result};
use std::ffi::OsString;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tempfile::{Builder, NamedTempFile};
use tracing::{debug, warn};

const TEMP_FILE_PREFIX: &str = "diff-crypt";

/// Anything that can encrypt 16-bit blocks
pub trait BlockOracle {
    /// Encrypt `blocks` in order, under `key` if given (the oracle's default
    /// key otherwise)
    fn encrypt(&self, blocks: &[u16], key: Option<&[u16]>) -> Result<Vec<u16>>;
}

/// Oracle that shells out to an external cipher implementation
#[derive(Debug, Clone)]
pub struct ExternalCipher {
    executable: PathBuf,
    launcher: Option<OsString>,
    sbox_number: u32,
    temp_dir: Option<PathBuf>,
    debug_mode: bool,
}

impl ExternalCipher {
    pub fn new(executable: impl Into<PathBuf>, sbox_number: u32) -> Self {
        Self {
            executable: executable.into(),
            launcher: None,
            sbox_number,
            temp_dir: None,
            debug_mode: false,
        }
    }

    /// Run the executable through another program (e.g. `wine` or `sh`)
    pub fn with_launcher(mut self, launcher: impl Into<OsString>) -> Self {
        self.launcher = Some(launcher.into());
        self
    }

    /// Place temporary files in `dir` instead of the system temp directory
    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = Some(dir.into());
        self
    }

    pub fn with_debug(mut self, debug_mode: bool) -> Self {
        self.debug_mode = debug_mode;
        self
    }

    fn temp_file(&self) -> io::Result<NamedTempFile> {
        let mut builder = Builder::new();
        builder.prefix(TEMP_FILE_PREFIX);
        match &self.temp_dir {
            Some(dir) => builder.tempfile_in(dir),
            None => builder.tempfile(),
        }
    }

    fn command(&self, plaintext: &Path, ciphertext: &Path, key: Option<&Path>) -> Command {
        let mut command = match &self.launcher {
            Some(launcher) => {
                let mut command = Command::new(launcher);
                command.arg(&self.executable);
                command
            }
            None => Command::new(&self.executable),
        };
        command
            .arg(if self.debug_mode { "e*" } else { "e" })
            .arg(self.sbox_number.to_string())
            .arg(plaintext)
            .arg(ciphertext);
        if let Some(key) = key {
            command.arg(key);
        }
        command.stdin(Stdio::piped());
        if self.debug_mode {
            command.stdout(Stdio::inherit()).stderr(Stdio::inherit());
        } else {
            command.stdout(Stdio::null()).stderr(Stdio::null());
        }
        command
    }

    /// Keep a temp file on disk in debug mode, otherwise let it be removed
    fn release(&self, file: NamedTempFile) {
        if self.debug_mode {
            match file.keep() {
                Ok((_, path)) => debug!(path = %path.display(), "kept oracle temp file"),
                Err(e) => warn!("failed to keep oracle temp file: {}", e),
            }
        } else if let Err(e) = file.close() {
            warn!("failed to delete oracle temp file: {}", e);
        }
    }
}

impl BlockOracle for ExternalCipher {
    fn encrypt(&self, blocks: &[u16], key: Option<&[u16]>) -> Result<Vec<u16>> {
        let mut plaintext = self.temp_file()?;
        write_words(plaintext.as_file_mut(), blocks)?;
        plaintext.as_file_mut().flush()?;

        let ciphertext = self.temp_file()?;

        let key_file = match key {
            Some(words) => {
                let mut file = self.temp_file()?;
                write_words(file.as_file_mut(), words)?;
                file.as_file_mut().flush()?;
                Some(file)
            }
            None => None,
        };

        let mut command = self.command(
            plaintext.path(),
            ciphertext.path(),
            key_file.as_ref().map(|f| f.path()),
        );
        debug!(command = ?command, blocks = blocks.len(), "running external cipher");

        let mut child = command.spawn()?;
        if let Some(mut stdin) = child.stdin.take() {
            // The cipher waits for Enter before exiting
            match stdin.write_all(b"\r") {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {}
                Err(e) => return Err(e.into()),
            }
        }
        let status = child.wait()?;
        if !status.success() {
            return Err(DiffError::oracle(format!(
                "{} exited with {}",
                self.executable.display(),
                status
            )));
        }

        let bytes = fs::read(ciphertext.path())?;
        let result = read_words(&bytes, blocks.len())?;

        self.release(plaintext);
        self.release(ciphertext);
        if let Some(file) = key_file {
            self.release(file);
        }

        Ok(result)
    }
}

/// Write words as consecutive 2-byte little-endian values
pub fn write_words<W: Write>(out: &mut W, words: &[u16]) -> io::Result<()> {
    for word in words {
        out.write_all(&word.to_le_bytes())?;
    }
    Ok(())
}

/// Decode `count` little-endian words from `bytes`
pub fn read_words(bytes: &[u8], count: usize) -> Result<Vec<u16>> {
    if bytes.len() < count * 2 {
        return Err(DiffError::oracle(format!(
            "expected {} ciphertext bytes, found {}",
            count * 2,
            bytes.len()
        )));
    }
    Ok(bytes
        .chunks_exact(2)
        .take(count)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_word_encoding_is_little_endian() {
        let mut buffer = Vec::new();
        write_words(&mut buffer, &[0x1234, 0xABCD]).unwrap();
        assert_eq!(buffer, vec![0x34, 0x12, 0xCD, 0xAB]);
        assert_eq!(read_words(&buffer, 2).unwrap(), vec![0x1234, 0xABCD]);
    }

    #[test]
    fn test_read_words_short_input() {
        assert!(matches!(read_words(&[1, 2, 3], 2), Err(DiffError::Oracle(_))));
        // Extra trailing bytes are ignored
        assert_eq!(read_words(&[1, 0, 2, 0, 9], 2).unwrap(), vec![1, 2]);
    }

    #[test]
    fn test_command_line() {
        let cipher = ExternalCipher::new("/opt/heys/heys.exe", 7).with_launcher("wine");
        let command = cipher.command(Path::new("pt"), Path::new("ct"), Some(Path::new("key")));
        assert_eq!(command.get_program(), "wine");
        let args: Vec<_> = command.get_args().collect();
        assert_eq!(args, vec!["/opt/heys/heys.exe", "e", "7", "pt", "ct", "key"]);

        let debug = ExternalCipher::new("heys", 1).with_debug(true);
        let command = debug.command(Path::new("pt"), Path::new("ct"), None);
        let args: Vec<_> = command.get_args().collect();
        assert_eq!(args, vec!["e*", "1", "pt", "ct"]);
    }

    #[cfg(unix)]
    fn script_cipher(dir: &Path, body: &str) -> ExternalCipher {
        let script = dir.join("cipher.sh");
        fs::write(&script, body).unwrap();
        ExternalCipher::new(script, 3)
            .with_launcher("sh")
            .with_temp_dir(dir)
    }

    #[cfg(unix)]
    #[test]
    fn test_external_cipher_round_trip_through_files() {
        let dir = tempfile::tempdir().unwrap();
        // Identity "cipher": copy plaintext to ciphertext
        let cipher = script_cipher(dir.path(), "cat \"$3\" > \"$4\"\n");

        let blocks = vec![0x0000, 0x0B00, 0xFFFF, 0x1234];
        assert_eq!(cipher.encrypt(&blocks, None).unwrap(), blocks);
        assert_eq!(cipher.encrypt(&blocks, Some(&[0xAAAA; 7])).unwrap(), blocks);

        // Only the script remains; temp files were cleaned up
        let leftovers: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().starts_with(TEMP_FILE_PREFIX))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_external_cipher_failure() {
        let dir = tempfile::tempdir().unwrap();
        let cipher = script_cipher(dir.path(), "exit 3\n");
        assert!(matches!(
            cipher.encrypt(&[1, 2], None),
            Err(DiffError::Oracle(_))
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_external_cipher_short_output() {
        let dir = tempfile::tempdir().unwrap();
        let cipher = script_cipher(dir.path(), "printf 'x' > \"$4\"\n");
        assert!(matches!(
            cipher.encrypt(&[1, 2], None),
            Err(DiffError::Oracle(_))
        ));
    }
}
