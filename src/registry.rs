//! Binary product registry decoder.
//!
//! The game launcher keeps a `product.db` describing every installed
//! product as a nested, tagged, length-delimited record (varint field tags,
//! explicitly numbered fields). Only a handful of fields are ever consumed,
//! so this is a minimal hand-rolled reader rather than a schema engine:
//!
//! - registry: products (field 1, repeated message), product names (field 7,
//!   repeated string)
//! - product:  name (1, string), alias (2, string), client (3, message),
//!   family (6, string)
//! - client:   location (1, string), name (13, string)
//!
//! Records whose family is not [`GAME_FAMILY`] are discarded. Decode failure
//! is the caller's soft-fail point: log it and carry on with zero products.

use crate::client::ClientType;
use anyhow::{bail, Context, Result};
use std::path::PathBuf;

/// Product family token identifying game installs among launcher products.
pub const GAME_FAMILY: &str = "wow";

/// One installed game variant, as reported by the launcher registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledProduct {
    /// Install location on disk.
    pub location: PathBuf,
    /// Internal folder token, e.g. `_retail_`.
    pub name: String,
    /// Client type derived from the folder token.
    pub client_type: ClientType,
}

/// Raw decoded registry, before family filtering.
#[derive(Debug, Clone, Default)]
pub struct ProductRegistry {
    pub products: Vec<ProductRecord>,
    pub product_names: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ProductRecord {
    pub name: String,
    pub alias: String,
    pub client: ClientRecord,
    pub family: String,
}

#[derive(Debug, Clone, Default)]
pub struct ClientRecord {
    pub location: String,
    pub name: String,
}

// Wire types of the tagged binary format.
const WIRE_VARINT: u8 = 0;
const WIRE_FIXED64: u8 = 1;
const WIRE_LEN: u8 = 2;
const WIRE_FIXED32: u8 = 5;

/// Byte-level reader over a registry buffer.
struct WireReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> WireReader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn is_empty(&self) -> bool {
        self.pos >= self.buf.len()
    }

    fn read_varint(&mut self) -> Result<u64> {
        let mut value: u64 = 0;
        let mut shift = 0u32;
        loop {
            let Some(&byte) = self.buf.get(self.pos) else {
                bail!("truncated varint at offset {}", self.pos);
            };
            self.pos += 1;
            if shift >= 64 {
                bail!("varint overflow at offset {}", self.pos);
            }
            value |= u64::from(byte & 0x7f) << shift;
            if byte & 0x80 == 0 {
                return Ok(value);
            }
            shift += 7;
        }
    }

    fn read_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|&end| end <= self.buf.len())
            .with_context(|| format!("truncated field of {len} bytes at offset {}", self.pos))?;
        let slice = &self.buf[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    /// Reads the next field tag: (field number, wire type).
    fn read_tag(&mut self) -> Result<(u32, u8)> {
        let tag = self.read_varint()?;
        Ok(((tag >> 3) as u32, (tag & 0x7) as u8))
    }

    fn read_len_delimited(&mut self) -> Result<&'a [u8]> {
        let len = self.read_varint()?;
        self.read_bytes(len as usize)
    }

    fn read_string(&mut self) -> Result<String> {
        let bytes = self.read_len_delimited()?;
        Ok(String::from_utf8_lossy(bytes).into_owned())
    }

    /// Skips over a field of any known wire type.
    fn skip(&mut self, wire_type: u8) -> Result<()> {
        match wire_type {
            WIRE_VARINT => {
                self.read_varint()?;
            }
            WIRE_FIXED64 => {
                self.read_bytes(8)?;
            }
            WIRE_LEN => {
                self.read_len_delimited()?;
            }
            WIRE_FIXED32 => {
                self.read_bytes(4)?;
            }
            other => bail!("unsupported wire type {other}"),
        }
        Ok(())
    }
}

fn decode_client(bytes: &[u8]) -> Result<ClientRecord> {
    let mut reader = WireReader::new(bytes);
    let mut client = ClientRecord::default();
    while !reader.is_empty() {
        let (field, wire) = reader.read_tag()?;
        match (field, wire) {
            (1, WIRE_LEN) => client.location = reader.read_string()?,
            (13, WIRE_LEN) => client.name = reader.read_string()?,
            (_, wire) => reader.skip(wire)?,
        }
    }
    Ok(client)
}

fn decode_product(bytes: &[u8]) -> Result<ProductRecord> {
    let mut reader = WireReader::new(bytes);
    let mut product = ProductRecord::default();
    while !reader.is_empty() {
        let (field, wire) = reader.read_tag()?;
        match (field, wire) {
            (1, WIRE_LEN) => product.name = reader.read_string()?,
            (2, WIRE_LEN) => product.alias = reader.read_string()?,
            (3, WIRE_LEN) => product.client = decode_client(reader.read_len_delimited()?)?,
            (6, WIRE_LEN) => product.family = reader.read_string()?,
            (_, wire) => reader.skip(wire)?,
        }
    }
    Ok(product)
}

/// Decodes the full registry. Fails on malformed bytes; callers treat that
/// as "zero installed products" (see [`crate::lifecycle::AddonService`]).
pub fn decode_registry(bytes: &[u8]) -> Result<ProductRegistry> {
    let mut reader = WireReader::new(bytes);
    let mut registry = ProductRegistry::default();
    while !reader.is_empty() {
        let (field, wire) = reader.read_tag()?;
        match (field, wire) {
            (1, WIRE_LEN) => {
                let product = decode_product(reader.read_len_delimited()?)
                    .context("malformed product record")?;
                registry.products.push(product);
            }
            (7, WIRE_LEN) => registry.product_names.push(reader.read_string()?),
            (_, wire) => reader.skip(wire)?,
        }
    }
    Ok(registry)
}

/// Decodes the registry and keeps only game-family products, mapping each to
/// an [`InstalledProduct`].
pub fn installed_products(bytes: &[u8]) -> Result<Vec<InstalledProduct>> {
    let registry = decode_registry(bytes)?;
    Ok(registry
        .products
        .into_iter()
        .filter(|p| p.family == GAME_FAMILY)
        .map(|p| InstalledProduct {
            location: PathBuf::from(&p.client.location),
            client_type: ClientType::from_folder_name(&p.client.name),
            name: p.client.name,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    // Minimal writer mirroring the wire format, for building fixtures.
    fn put_varint(buf: &mut Vec<u8>, mut value: u64) {
        loop {
            let byte = (value & 0x7f) as u8;
            value >>= 7;
            if value == 0 {
                buf.push(byte);
                return;
            }
            buf.push(byte | 0x80);
        }
    }

    fn put_str(buf: &mut Vec<u8>, field: u32, value: &str) {
        put_varint(buf, u64::from(field) << 3 | u64::from(WIRE_LEN));
        put_varint(buf, value.len() as u64);
        buf.extend_from_slice(value.as_bytes());
    }

    fn put_message(buf: &mut Vec<u8>, field: u32, body: &[u8]) {
        put_varint(buf, u64::from(field) << 3 | u64::from(WIRE_LEN));
        put_varint(buf, body.len() as u64);
        buf.extend_from_slice(body);
    }

    fn encode_product(name: &str, location: &str, client_name: &str, family: &str) -> Vec<u8> {
        let mut client = Vec::new();
        put_str(&mut client, 1, location);
        put_str(&mut client, 13, client_name);

        let mut product = Vec::new();
        put_str(&mut product, 1, name);
        put_str(&mut product, 2, name);
        put_message(&mut product, 3, &client);
        put_str(&mut product, 6, family);
        product
    }

    fn encode_registry(products: &[Vec<u8>], names: &[&str]) -> Vec<u8> {
        let mut buf = Vec::new();
        for product in products {
            put_message(&mut buf, 1, product);
        }
        for name in names {
            put_str(&mut buf, 7, name);
        }
        buf
    }

    #[test]
    fn decodes_products_and_names() {
        let bytes = encode_registry(
            &[encode_product("wow", "C:/Games/WoW", "_retail_", "wow")],
            &["wow", "agent"],
        );

        let registry = decode_registry(&bytes).unwrap();
        assert_eq!(registry.products.len(), 1);
        assert_eq!(registry.products[0].name, "wow");
        assert_eq!(registry.products[0].client.location, "C:/Games/WoW");
        assert_eq!(registry.products[0].client.name, "_retail_");
        assert_eq!(registry.product_names, vec!["wow", "agent"]);
    }

    #[test]
    fn only_game_family_products_survive_filtering() {
        let bytes = encode_registry(
            &[
                encode_product("wow", "C:/Games/WoW", "_retail_", "wow"),
                encode_product("wow_classic", "C:/Games/Classic", "_classic_", "wow"),
                encode_product("pro", "C:/Games/Overwatch", "overwatch", "pro"),
                encode_product("agent", "C:/Agent", "agent", "agent"),
            ],
            &[],
        );

        let products = installed_products(&bytes).unwrap();
        assert_eq!(products.len(), 2);
        assert!(products.iter().all(|p| p.name.starts_with('_')));
        assert_eq!(products[0].client_type, ClientType::Retail);
        assert_eq!(products[1].client_type, ClientType::Classic);
    }

    #[test]
    fn unknown_fields_of_every_wire_type_are_skipped() {
        let mut product = encode_product("wow", "/games/wow", "_retail_", "wow");
        // field 9, varint
        put_varint(&mut product, 9 << 3 | u64::from(WIRE_VARINT));
        put_varint(&mut product, 300);
        // field 10, fixed64
        put_varint(&mut product, 10 << 3 | u64::from(WIRE_FIXED64));
        product.extend_from_slice(&[0u8; 8]);
        // field 11, fixed32
        put_varint(&mut product, 11 << 3 | u64::from(WIRE_FIXED32));
        product.extend_from_slice(&[0u8; 4]);
        // field 12, len-delimited
        put_str(&mut product, 12, "ignored");

        let bytes = encode_registry(&[product], &[]);
        let products = installed_products(&bytes).unwrap();
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].location, PathBuf::from("/games/wow"));
    }

    #[test]
    fn truncated_input_is_an_error_not_a_panic() {
        let bytes = encode_registry(
            &[encode_product("wow", "C:/Games/WoW", "_retail_", "wow")],
            &[],
        );
        assert!(decode_registry(&bytes[..bytes.len() - 3]).is_err());
        // A lone continuation byte is a truncated varint.
        assert!(decode_registry(&[0x80]).is_err());
    }

    #[test]
    fn unrecognized_client_folder_becomes_none_client_type() {
        let bytes = encode_registry(
            &[encode_product("wow_era", "/games/era", "_classic_era_", "wow")],
            &[],
        );
        let products = installed_products(&bytes).unwrap();
        assert_eq!(products[0].client_type, ClientType::None);
    }
}
