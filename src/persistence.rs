//! Binary index file persistence.
//!
//! Layout, all integers little-endian fixed-width: a header (magic, dims,
//! degree, Hilbert order) followed by the tree height, per-level node
//! counts, total and leaf node counts, the node arena in breadth-first
//! order, and finally the leaf SOA records. Child references are arena
//! indices both in memory and on disk, so dump and load are direct block
//! transfers with no relocation pass.
//!
//! A missing file is reported as `Ok(None)` and the caller rebuilds; every
//! other malformed condition is unrecoverable.

use crate::error::{HybridError, Result};
use crate::node::{Node, NodeKind, NodeSoa};
use crate::tree::HybridTree;
use crate::types::{Point, Rect, TreeConfig};
use bytes::{BufMut, BytesMut};
use std::fs::File;
use std::io::{ErrorKind, Read, Write};
use std::path::Path;

const MAGIC: [u8; 4] = *b"HTIX";

const KIND_INTERNAL: u8 = 0;
const KIND_LEAF: u8 = 1;

/// Serialize `tree` to the index file at `path`.
pub fn dump<const D: usize>(tree: &HybridTree<D>, path: &Path) -> Result<()> {
    let mut buf = BytesMut::with_capacity(estimate_size(tree));

    buf.put_slice(&MAGIC);
    buf.put_u32_le(D as u32);
    buf.put_u32_le(tree.config.degree as u32);
    buf.put_u32_le(tree.config.hilbert_order);

    buf.put_u64_le(tree.height() as u64);
    for &count in tree.level_node_count() {
        buf.put_u32_le(count);
    }
    buf.put_u32_le(tree.total_node_count() as u32);
    buf.put_u32_le(tree.leaf_node_count() as u32);

    for node in &tree.nodes {
        encode_node(&mut buf, node);
    }
    for record in tree.leaves() {
        encode_soa(&mut buf, record);
    }

    let mut file = File::create(path)?;
    file.write_all(&buf)?;
    file.sync_all()?;
    Ok(())
}

/// Deserialize the index file at `path`, verifying it against `config`.
///
/// Returns `Ok(None)` when no file exists at `path`.
pub fn load<const D: usize>(path: &Path, config: &TreeConfig) -> Result<Option<HybridTree<D>>> {
    let mut file = match File::open(path) {
        Ok(file) => file,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(err.into()),
    };
    let mut raw = Vec::new();
    file.read_to_end(&mut raw)?;

    let mut cursor = Cursor::new(&raw);

    let magic = cursor.take_bytes(4)?;
    if magic != MAGIC.as_slice() {
        return Err(HybridError::InvalidFormat(
            "bad magic, not a hybridtree index file".to_string(),
        ));
    }
    let dims = cursor.get_u32()?;
    let degree = cursor.get_u32()?;
    let hilbert_order = cursor.get_u32()?;
    if dims as usize != D {
        return Err(HybridError::ConfigMismatch(format!(
            "index has {} dims, expected {}",
            dims, D
        )));
    }
    if degree as usize != config.degree || hilbert_order != config.hilbert_order {
        return Err(HybridError::ConfigMismatch(format!(
            "index built with degree {} / order {}, expected degree {} / order {}",
            degree, hilbert_order, config.degree, config.hilbert_order
        )));
    }

    let height = cursor.get_u64()? as usize;
    if height > cursor.remaining() / 4 {
        return Err(HybridError::InvalidFormat(format!(
            "height {} exceeds what the file could hold",
            height
        )));
    }
    let mut level_node_count = Vec::with_capacity(height);
    for _ in 0..height {
        level_node_count.push(cursor.get_u32()?);
    }
    let total_node_count = cursor.get_u32()? as usize;
    let leaf_node_count = cursor.get_u32()? as usize;

    let level_sum: u64 = level_node_count.iter().map(|&c| u64::from(c)).sum();
    if level_sum != total_node_count as u64 {
        return Err(HybridError::InvalidFormat(format!(
            "level counts sum to {}, header says {} nodes",
            level_sum, total_node_count
        )));
    }
    if height > 0 && level_node_count[0] != 1 {
        return Err(HybridError::InvalidFormat(
            "top level must hold exactly the root".to_string(),
        ));
    }
    let bottom = level_node_count.last().copied().unwrap_or(0) as usize;
    if bottom != leaf_node_count {
        return Err(HybridError::InvalidFormat(format!(
            "bottom level holds {} nodes, header says {} leaf records",
            bottom, leaf_node_count
        )));
    }
    // Every node record occupies at least its tag and count bytes.
    if total_node_count > cursor.remaining() {
        return Err(HybridError::InvalidFormat(format!(
            "node count {} exceeds what the file could hold",
            total_node_count
        )));
    }

    let mut nodes = Vec::with_capacity(total_node_count);
    for _ in 0..total_node_count {
        nodes.push(decode_node::<D>(&mut cursor, total_node_count, config.degree)?);
    }
    let mut leaves = Vec::with_capacity(leaf_node_count);
    for _ in 0..leaf_node_count {
        leaves.push(decode_soa::<D>(&mut cursor, config.degree)?);
    }

    if !cursor.is_empty() {
        return Err(HybridError::InvalidFormat(format!(
            "{} trailing bytes after leaf records",
            cursor.remaining()
        )));
    }

    Ok(Some(HybridTree {
        config: config.clone(),
        nodes,
        level_node_count,
        leaves,
    }))
}

fn encode_node<const D: usize>(buf: &mut BytesMut, node: &Node<D>) {
    buf.put_u8(match node.kind {
        NodeKind::Internal => KIND_INTERNAL,
        NodeKind::Leaf => KIND_LEAF,
    });
    buf.put_u32_le(node.branches.len() as u32);
    for branch in &node.branches {
        for dim in 0..D {
            buf.put_f32_le(branch.rect.low.coord(dim));
        }
        for dim in 0..D {
            buf.put_f32_le(branch.rect.high.coord(dim));
        }
        buf.put_u64_le(branch.key);
        buf.put_u64_le(branch.ordinal);
        buf.put_u32_le(branch.child);
    }
}

fn decode_node<const D: usize>(
    cursor: &mut Cursor<'_>,
    total: usize,
    degree: usize,
) -> Result<Node<D>> {
    let kind = match cursor.get_u8()? {
        KIND_INTERNAL => NodeKind::Internal,
        KIND_LEAF => NodeKind::Leaf,
        other => {
            return Err(HybridError::InvalidFormat(format!(
                "unknown node kind tag {}",
                other
            )));
        }
    };
    let count = cursor.get_u32()? as usize;
    if count == 0 || count > degree {
        return Err(HybridError::InvalidFormat(format!(
            "node branch count {} outside 1..={}",
            count, degree
        )));
    }
    let mut branches = Vec::with_capacity(count);
    for _ in 0..count {
        let mut low = [0.0f32; D];
        let mut high = [0.0f32; D];
        for coord in low.iter_mut() {
            *coord = cursor.get_f32()?;
        }
        for coord in high.iter_mut() {
            *coord = cursor.get_f32()?;
        }
        let key = cursor.get_u64()?;
        let ordinal = cursor.get_u64()?;
        let child = cursor.get_u32()?;
        if kind == NodeKind::Internal && child as usize >= total {
            return Err(HybridError::InvalidFormat(format!(
                "child index {} out of range ({} nodes)",
                child, total
            )));
        }
        branches.push(crate::branch::Branch {
            rect: Rect {
                low: Point(low),
                high: Point(high),
            },
            key,
            ordinal,
            child,
        });
    }
    Ok(Node { kind, branches })
}

fn encode_soa<const D: usize>(buf: &mut BytesMut, record: &NodeSoa<D>) {
    let (len, low, high, ordinal, payload) = record.raw_parts();
    buf.put_u32_le(len as u32);
    for &value in low {
        buf.put_f32_le(value);
    }
    for &value in high {
        buf.put_f32_le(value);
    }
    for &value in ordinal {
        buf.put_u64_le(value);
    }
    for &value in payload {
        buf.put_u32_le(value);
    }
}

fn decode_soa<const D: usize>(cursor: &mut Cursor<'_>, degree: usize) -> Result<NodeSoa<D>> {
    let len = cursor.get_u32()? as usize;
    if len == 0 || len > degree {
        return Err(HybridError::InvalidFormat(format!(
            "leaf record length {} outside 1..={}",
            len, degree
        )));
    }
    let mut low = Vec::with_capacity(D * len);
    for _ in 0..D * len {
        low.push(cursor.get_f32()?);
    }
    let mut high = Vec::with_capacity(D * len);
    for _ in 0..D * len {
        high.push(cursor.get_f32()?);
    }
    let mut ordinal = Vec::with_capacity(len);
    for _ in 0..len {
        ordinal.push(cursor.get_u64()?);
    }
    let mut payload = Vec::with_capacity(len);
    for _ in 0..len {
        payload.push(cursor.get_u32()?);
    }
    Ok(NodeSoa::from_raw_parts(len, low, high, ordinal, payload))
}

fn estimate_size<const D: usize>(tree: &HybridTree<D>) -> usize {
    let branch_size = 8 * D + 20;
    let node_bytes: usize = tree
        .nodes
        .iter()
        .map(|node| 5 + node.branches.len() * branch_size)
        .sum();
    let leaf_bytes: usize = tree
        .leaves()
        .iter()
        .map(|record| 4 + record.len() * (8 * D + 12))
        .sum();
    32 + tree.height() * 4 + node_bytes + leaf_bytes
}

/// Bounds-checked little-endian reader over the raw file bytes.
struct Cursor<'a> {
    data: &'a [u8],
}

impl<'a> Cursor<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    fn remaining(&self) -> usize {
        self.data.len()
    }

    fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    fn take_bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.data.len() < n {
            return Err(HybridError::UnexpectedEof);
        }
        let (head, tail) = self.data.split_at(n);
        self.data = tail;
        Ok(head)
    }

    fn get_u8(&mut self) -> Result<u8> {
        Ok(self.take_bytes(1)?[0])
    }

    fn get_u32(&mut self) -> Result<u32> {
        let bytes = self.take_bytes(4)?;
        Ok(u32::from_le_bytes(bytes.try_into().expect("4 bytes")))
    }

    fn get_u64(&mut self) -> Result<u64> {
        let bytes = self.take_bytes(8)?;
        Ok(u64::from_le_bytes(bytes.try_into().expect("8 bytes")))
    }

    fn get_f32(&mut self) -> Result<f32> {
        let bytes = self.take_bytes(4)?;
        Ok(f32::from_le_bytes(bytes.try_into().expect("4 bytes")))
    }
}
