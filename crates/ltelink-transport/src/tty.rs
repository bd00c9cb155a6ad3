use std::ffi::CString;
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd};
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::{Result, TransportError};
use crate::port::ModemPort;

/// A serial device in raw mode.
///
/// Opens the tty non-blocking with echo, line editing, and flow translation
/// disabled, so the modem's byte stream arrives untouched. Reads return
/// immediately; pacing is the caller's job via [`Deadline`](crate::Deadline).
pub struct TtyPort {
    fd: OwnedFd,
    path: PathBuf,
}

impl TtyPort {
    /// Open `path` at `baud` and switch it to raw mode.
    ///
    /// Any input or output pending on the device is flushed, so a fresh
    /// engine never sees leftovers from a previous run.
    pub fn open(path: impl AsRef<Path>, baud: u32) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let speed = baud_constant(baud).ok_or(TransportError::UnsupportedBaud(baud))?;

        let cpath = CString::new(path.as_os_str().as_bytes()).map_err(|_| TransportError::Open {
            path: path.clone(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "path contains NUL"),
        })?;

        // SAFETY: `cpath` is a valid NUL-terminated string for the duration
        // of the call.
        let raw = unsafe {
            libc::open(
                cpath.as_ptr(),
                libc::O_RDWR | libc::O_NOCTTY | libc::O_NONBLOCK | libc::O_CLOEXEC,
            )
        };
        if raw < 0 {
            return Err(TransportError::Open {
                path,
                source: std::io::Error::last_os_error(),
            });
        }
        // SAFETY: `raw` is a freshly opened descriptor owned by this process.
        let fd = unsafe { OwnedFd::from_raw_fd(raw) };

        let mut termios = std::mem::MaybeUninit::<libc::termios>::uninit();
        // SAFETY: `termios` is a valid writable pointer and `fd` is open.
        if unsafe { libc::tcgetattr(fd.as_raw_fd(), termios.as_mut_ptr()) } != 0 {
            return Err(TransportError::Configure {
                path,
                source: std::io::Error::last_os_error(),
            });
        }
        // SAFETY: tcgetattr succeeded, so the struct is initialized.
        let mut termios = unsafe { termios.assume_init() };

        // SAFETY: `termios` is a valid, initialized termios struct.
        unsafe {
            libc::cfmakeraw(&mut termios);
        }
        // Non-blocking reads: return whatever is buffered, possibly nothing.
        termios.c_cc[libc::VMIN] = 0;
        termios.c_cc[libc::VTIME] = 0;

        // SAFETY: same termios struct; speed is a valid Bxxx constant.
        let rc = unsafe {
            if libc::cfsetispeed(&mut termios, speed) != 0
                || libc::cfsetospeed(&mut termios, speed) != 0
            {
                -1
            } else {
                libc::tcsetattr(fd.as_raw_fd(), libc::TCSANOW, &termios)
            }
        };
        if rc != 0 {
            return Err(TransportError::Configure {
                path,
                source: std::io::Error::last_os_error(),
            });
        }

        // SAFETY: `fd` is an open tty descriptor.
        unsafe {
            libc::tcflush(fd.as_raw_fd(), libc::TCIOFLUSH);
        }

        info!(path = %path.display(), baud, "serial port open");
        Ok(Self { fd, path })
    }

    /// The device path this port was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ModemPort for TtyPort {
    fn read_byte(&mut self) -> Result<Option<u8>> {
        let mut byte = 0u8;
        // SAFETY: `byte` is a valid writable byte and `fd` is open.
        let n = unsafe { libc::read(self.fd.as_raw_fd(), (&mut byte as *mut u8).cast(), 1) };
        match n {
            1 => Ok(Some(byte)),
            0 => Ok(None),
            _ => {
                let err = std::io::Error::last_os_error();
                match err.kind() {
                    std::io::ErrorKind::WouldBlock | std::io::ErrorKind::Interrupted => Ok(None),
                    _ => Err(TransportError::Io(err)),
                }
            }
        }
    }

    fn bytes_available(&mut self) -> Result<usize> {
        let mut pending: libc::c_int = 0;
        // SAFETY: FIONREAD writes a c_int through the provided pointer.
        let rc = unsafe { libc::ioctl(self.fd.as_raw_fd(), libc::FIONREAD, &mut pending) };
        if rc != 0 {
            return Err(TransportError::Io(std::io::Error::last_os_error()));
        }
        Ok(pending.max(0) as usize)
    }

    fn write_all(&mut self, data: &[u8]) -> Result<()> {
        let mut offset = 0usize;
        while offset < data.len() {
            let rest = &data[offset..];
            // SAFETY: `rest` is a valid readable slice and `fd` is open.
            let n = unsafe { libc::write(self.fd.as_raw_fd(), rest.as_ptr().cast(), rest.len()) };
            if n >= 0 {
                offset += n as usize;
                continue;
            }
            let err = std::io::Error::last_os_error();
            match err.kind() {
                std::io::ErrorKind::Interrupted => continue,
                std::io::ErrorKind::WouldBlock => {
                    // The UART's output buffer is full; give it a moment.
                    std::thread::sleep(std::time::Duration::from_micros(500));
                }
                _ => return Err(TransportError::Io(err)),
            }
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        // SAFETY: `fd` is an open tty descriptor.
        let rc = unsafe { libc::tcdrain(self.fd.as_raw_fd()) };
        if rc != 0 {
            return Err(TransportError::Io(std::io::Error::last_os_error()));
        }
        Ok(())
    }
}

impl std::fmt::Debug for TtyPort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TtyPort").field("path", &self.path).finish()
    }
}

fn baud_constant(baud: u32) -> Option<libc::speed_t> {
    match baud {
        9_600 => Some(libc::B9600),
        19_200 => Some(libc::B19200),
        38_400 => Some(libc::B38400),
        57_600 => Some(libc::B57600),
        115_200 => Some(libc::B115200),
        230_400 => Some(libc::B230400),
        #[cfg(target_os = "linux")]
        460_800 => Some(libc::B460800),
        #[cfg(target_os = "linux")]
        921_600 => Some(libc::B921600),
        _ => None,
    }
}
