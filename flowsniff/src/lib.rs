pub mod app;
pub mod capture;
pub mod cidr;
pub mod cmd;
pub mod collector;
pub mod config;
pub mod metrics;
pub mod network;
pub mod sink;

pub use util::uname;

pub mod util {
    use std::{
        ffi::{c_char, CStr, CString},
        io,
    };

    use anyhow::{anyhow, Result};

    pub fn uname() -> io::Result<SysInfo> {
        let mut buf = unsafe { std::mem::zeroed() };
        match unsafe { libc::uname(&mut buf) } {
            0 => Ok(SysInfo::from(buf)),
            _ => Err(io::Error::last_os_error()),
        }
    }

    #[derive(Debug)]
    pub struct SysInfo {
        pub sys_name: String,
        pub node_name: String,
        pub release: String,
        pub version: String,
    }

    impl From<libc::utsname> for SysInfo {
        fn from(value: libc::utsname) -> Self {
            Self {
                sys_name: cstr(&value.sysname[..]).to_string_lossy().to_string(),
                node_name: cstr(&value.nodename[..]).to_string_lossy().to_string(),
                release: cstr(&value.release[..]).to_string_lossy().to_string(),
                version: cstr(&value.version[..]).to_string_lossy().to_string(),
            }
        }
    }

    #[inline]
    fn cstr(buf: &[c_char]) -> &CStr {
        unsafe { CStr::from_ptr(buf.as_ptr()) }
    }

    /// Resolves an interface name to its kernel index.
    pub fn if_index(iface: &str) -> Result<u32> {
        let name = CString::new(iface)
            .map_err(|_| anyhow!("interface name '{}' contains a NUL byte", iface))?;
        match unsafe { libc::if_nametoindex(name.as_ptr()) } {
            0 => Err(anyhow!(
                "network interface '{}' not found: {}",
                iface,
                io::Error::last_os_error()
            )),
            idx => Ok(idx),
        }
    }

    pub fn lookup_interface<'a, I>(ifaces: I) -> Result<()>
    where
        I: IntoIterator<Item = &'a str>,
    {
        for iface in ifaces {
            if_index(iface)?;
        }
        Ok(())
    }

    #[cfg(test)]
    mod test {
        use super::{if_index, uname};

        #[test]
        fn test_unknown_interface() {
            assert!(if_index("no-such-if0").is_err());
            assert!(if_index("bad\0name").is_err());
        }

        #[test]
        fn test_uname() {
            let info = uname().unwrap();
            assert!(!info.sys_name.is_empty());
        }
    }
}
