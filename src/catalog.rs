use crate::prelude::*;

use crate::decoder::{self, DecodedValue};
use crate::enumeration::{EnumerationResolver, EnumerationTable};
use crate::error::CatalogError;
use crate::register::{AddressSpace, RegisterDefinition, RegisterTable};

use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;

const HOLDING: &str = include_str!("../catalogs/holding.yaml");
const INPUT: &str = include_str!("../catalogs/input.yaml");
const SELF_TEST: &str = include_str!("../catalogs/self_test.yaml");
const PARALLEL: &str = include_str!("../catalogs/parallel.yaml");

// On-disk form of one address space's catalog.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CatalogFile {
    space: AddressSpace,
    table: Option<RegisterTable>,
    #[serde(default)]
    enumerations: BTreeMap<String, BTreeMap<u16, String>>,
    registers: Vec<RegisterDefinition>,
}

/// Ordered register definitions of one address space, validated on load.
#[derive(Clone, Debug)]
pub struct Catalog {
    space: AddressSpace,
    table: RegisterTable,
    registers: Vec<RegisterDefinition>,
    // Tables declared by the catalog itself, kept so it can be written back out.
    enumerations: BTreeMap<String, BTreeMap<u16, String>>,
    resolver: EnumerationResolver,
}

impl Catalog {
    /// Builds a catalog, resolving enumeration names against `enumerations`
    /// first and the built-in tables second.
    pub fn new(
        space: AddressSpace,
        table: RegisterTable,
        mut registers: Vec<RegisterDefinition>,
        enumerations: &BTreeMap<String, BTreeMap<u16, String>>,
    ) -> Result<Self, CatalogError> {
        let mut resolver = EnumerationResolver::new();
        let mut tables: HashMap<String, Arc<EnumerationTable>> = HashMap::new();

        for register in registers.iter_mut() {
            register.refresh_kind();
            validate_register(register)?;

            let Some(name) = register.enumeration() else {
                continue;
            };
            if register.length() != 1 {
                return Err(CatalogError::EnumerationLength {
                    address: register.address(),
                    table: name.to_string(),
                    length: register.length(),
                });
            }

            let table = match tables.get(name) {
                Some(table) => table.clone(),
                None => {
                    let table = enumerations
                        .get(name)
                        .map(|labels| EnumerationTable::new(name, labels.clone()))
                        .or_else(|| EnumerationTable::builtin(name))
                        .map(Arc::new)
                        .ok_or_else(|| CatalogError::UnknownEnumeration {
                            address: register.address(),
                            table: name.to_string(),
                        })?;
                    tables.insert(name.to_string(), table.clone());
                    table
                }
            };
            resolver.register(register.address(), table);
        }

        check_overlaps(&registers)?;

        Ok(Self {
            space,
            table,
            registers,
            enumerations: enumerations.clone(),
            resolver,
        })
    }

    /// The catalog shipped with the crate for `space`.
    pub fn builtin(space: AddressSpace) -> Result<Self, CatalogError> {
        let content = match space {
            AddressSpace::Holding => HOLDING,
            AddressSpace::Input => INPUT,
            AddressSpace::SelfTest => SELF_TEST,
            AddressSpace::Parallel => PARALLEL,
        };
        Self::from_yaml(space, content)
    }

    pub fn from_yaml(space: AddressSpace, content: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile = serde_yaml::from_str(content)?;
        if file.space != space {
            return Err(CatalogError::SpaceMismatch {
                expected: space.to_string(),
                found: file.space.to_string(),
            });
        }

        let table = file.table.unwrap_or_else(|| space.default_table());
        Self::new(space, table, file.registers, &file.enumerations)
    }

    pub fn from_file<P: AsRef<Path>>(space: AddressSpace, path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|err| anyhow!("catalog.rs:error reading {}: {}", path.display(), err))?;

        Self::from_yaml(space, &content)
            .map_err(|err| anyhow!("catalog.rs:invalid catalog {}: {}", path.display(), err))
    }

    pub fn space(&self) -> AddressSpace {
        self.space
    }

    pub fn table(&self) -> RegisterTable {
        self.table
    }

    pub fn registers(&self) -> &[RegisterDefinition] {
        &self.registers
    }

    pub fn len(&self) -> usize {
        self.registers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registers.is_empty()
    }

    pub fn get(&self, address: u16) -> Option<&RegisterDefinition> {
        self.registers.iter().find(|r| r.address() == address)
    }

    pub fn enumerations(&self) -> &BTreeMap<String, BTreeMap<u16, String>> {
        &self.enumerations
    }

    pub fn resolver(&self) -> &EnumerationResolver {
        &self.resolver
    }

    pub fn decode(&self, definition: &RegisterDefinition, raw: &[u16]) -> DecodedValue {
        decoder::decode(definition, raw, &self.resolver)
    }
}

/// Loads the catalogs for `spaces`, in that order, preferring a file from
/// `overrides` over the built-in table.
pub fn load_catalogs(
    spaces: &[AddressSpace],
    overrides: &HashMap<AddressSpace, PathBuf>,
) -> Result<Vec<Catalog>> {
    let mut catalogs = Vec::with_capacity(spaces.len());

    for space in spaces {
        let catalog = match overrides.get(space) {
            Some(path) => {
                info!("Loading {} catalog from {}", space, path.display());
                Catalog::from_file(*space, path)?
            }
            None => Catalog::builtin(*space)
                .map_err(|err| anyhow!("catalog.rs:built-in {} catalog: {}", space, err))?,
        };
        info!(
            "  {} catalog: {} registers, read with function 0x{:02X}",
            space,
            catalog.len(),
            u8::from(catalog.table())
        );
        catalogs.push(catalog);
    }

    Ok(catalogs)
}

fn validate_register(register: &RegisterDefinition) -> Result<(), CatalogError> {
    if register.length() == 0 {
        return Err(CatalogError::ZeroLength {
            address: register.address(),
            description: register.description().to_string(),
        });
    }

    if register.end() > 0x1_0000 {
        return Err(CatalogError::OutOfRange {
            address: register.address(),
            description: register.description().to_string(),
        });
    }

    if let Some(scale) = register.raw_scale() {
        if !scale.is_finite() || scale <= 0.0 {
            return Err(CatalogError::InvalidScale {
                address: register.address(),
                description: register.description().to_string(),
                scale,
            });
        }
    }

    Ok(())
}

fn check_overlaps(registers: &[RegisterDefinition]) -> Result<(), CatalogError> {
    let mut sorted: Vec<&RegisterDefinition> = registers.iter().collect();
    sorted.sort_by_key(|r| r.address());

    for pair in sorted.windows(2) {
        let (previous, current) = (pair[0], pair[1]);
        if previous.end() > current.address() as u32 {
            return Err(CatalogError::Overlap {
                address: current.address(),
                previous: previous.address(),
                previous_length: previous.length(),
            });
        }
    }

    Ok(())
}
