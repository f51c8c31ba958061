pub use anyhow::{anyhow, bail, Result};
pub use log::{debug, error, info, trace, warn};

pub use std::io::Write;
pub use std::str::FromStr;

pub use crate::config::{self, Config};
pub use crate::file_error;
pub use crate::options::Options;
pub use crate::register::{AddressSpace, RegisterDefinition, RegisterKind, RegisterTable};
