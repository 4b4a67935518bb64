//! Component kernel repository: the precompiled kernel blob.
//!
//! Layout (all integers little-endian u32):
//!
//! ```text
//! [o0 .. oN]            N+1 offsets, o0 = 4 * (N + 1)
//! [o_i, o_i+1)          component i
//! ```
//!
//! The last component is the link file:
//!
//! ```text
//! version, size, imports, exports
//! (imports + exports) link records
//! ```

use std::collections::HashMap;
use std::io::{Cursor, Read};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use kdll_common::{KernelId, LabelId, LinkError};
use tracing::info;

use crate::record::{LinkRecord, RECORD_SIZE};

pub const LINK_FILE_VERSION: u32 = 1;
const LINK_HEADER_SIZE: usize = 16;

/// Read-only table of component kernels and their symbols.
#[derive(Clone, Debug, Default)]
pub struct ComponentRepository {
    kernels: Vec<Vec<u8>>,
    /// Link records grouped by owning kernel.
    records: Vec<Vec<LinkRecord>>,
    /// Defining kernel of every export label (first definition wins).
    exports: HashMap<LabelId, (KernelId, u32)>,
}

impl ComponentRepository {
    /// Parse a blob.
    pub fn from_bytes(blob: &[u8]) -> Result<Self, LinkError> {
        let components = split_components(blob)?;
        let Some((link_file, kernels)) = components.split_last() else {
            return Err(malformed("blob has no components"));
        };
        let kernels: Vec<Vec<u8>> = kernels.iter().map(|k| k.to_vec()).collect();
        let records = parse_link_file(link_file)?;

        let mut repo = Self {
            records: vec![Vec::new(); kernels.len()],
            kernels,
            exports: HashMap::new(),
        };
        let mut imports = 0usize;
        for r in records {
            let size = repo
                .kernels
                .get(r.kernel.index())
                .map(Vec::len)
                .ok_or(LinkError::InvalidKernel(r.kernel))?;
            if r.offset_bytes() > size {
                return Err(malformed(format!(
                    "{} symbol {} at byte {} outside {} bytes",
                    r.kernel,
                    r.label,
                    r.offset_bytes(),
                    size
                )));
            }
            if r.export {
                repo.exports
                    .entry(r.label)
                    .or_insert((r.kernel, r.offset_dwords));
            } else {
                imports += 1;
            }
            repo.records[r.kernel.index()].push(r);
        }

        info!(
            kernels = repo.kernels.len(),
            exports = repo.exports.len(),
            imports,
            bytes = blob.len(),
            "Loaded component kernel repository"
        );
        Ok(repo)
    }

    pub fn len(&self) -> usize {
        self.kernels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kernels.is_empty()
    }

    pub fn kernel(&self, id: KernelId) -> Result<&[u8], LinkError> {
        self.kernels
            .get(id.index())
            .map(Vec::as_slice)
            .ok_or(LinkError::InvalidKernel(id))
    }

    /// Link records of `id`, in blob order.
    pub fn records(&self, id: KernelId) -> &[LinkRecord] {
        self.records.get(id.index()).map_or(&[], Vec::as_slice)
    }

    /// Kernel defining `label`, and the export offset inside it in dwords.
    pub fn exporter(&self, label: LabelId) -> Option<(KernelId, u32)> {
        self.exports.get(&label).copied()
    }
}

fn malformed(msg: impl Into<String>) -> LinkError {
    LinkError::MalformedBlob(msg.into())
}

fn split_components(blob: &[u8]) -> Result<Vec<&[u8]>, LinkError> {
    let mut cursor = Cursor::new(blob);
    let first = cursor.read_u32::<LittleEndian>()? as usize;
    if first < 8 || first % 4 != 0 || first > blob.len() {
        return Err(malformed(format!("bad offset table size {first}")));
    }
    let count = first / 4 - 1;
    let mut offsets = Vec::with_capacity(count + 1);
    offsets.push(first);
    for _ in 0..count {
        offsets.push(cursor.read_u32::<LittleEndian>()? as usize);
    }
    let mut components = Vec::with_capacity(count);
    for w in offsets.windows(2) {
        let (start, end) = (w[0], w[1]);
        if start > end || end > blob.len() {
            return Err(malformed(format!("bad component range [{start}, {end})")));
        }
        components.push(&blob[start..end]);
    }
    Ok(components)
}

fn parse_link_file(data: &[u8]) -> Result<Vec<LinkRecord>, LinkError> {
    if data.len() < LINK_HEADER_SIZE {
        return Err(malformed("link file shorter than its header"));
    }
    let mut cursor = Cursor::new(data);
    let version = cursor.read_u32::<LittleEndian>()?;
    let size = cursor.read_u32::<LittleEndian>()? as usize;
    let imports = cursor.read_u32::<LittleEndian>()? as usize;
    let exports = cursor.read_u32::<LittleEndian>()? as usize;
    if version != LINK_FILE_VERSION {
        return Err(malformed(format!("unsupported link file version {version}")));
    }
    let count = imports + exports;
    if size != LINK_HEADER_SIZE + count * RECORD_SIZE || size > data.len() {
        return Err(malformed(format!(
            "link file size {size} does not fit {count} records"
        )));
    }
    let mut records = Vec::with_capacity(count);
    for _ in 0..count {
        let w0 = cursor.read_u32::<LittleEndian>()?;
        let w1 = cursor.read_u32::<LittleEndian>()?;
        records.push(LinkRecord::decode([w0, w1]));
    }
    let mut rest = Vec::new();
    cursor.read_to_end(&mut rest)?;
    if !rest.is_empty() {
        return Err(malformed(format!("{} trailing bytes in link file", rest.len())));
    }
    Ok(records)
}

// ─── Writer ─────────────────────────────────────────────────────────

/// Assembles a repository blob.
#[derive(Clone, Debug, Default)]
pub struct BlobWriter {
    kernels: Vec<Vec<u8>>,
    records: Vec<LinkRecord>,
}

impl BlobWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a kernel binary and return its id.
    pub fn add_kernel(&mut self, binary: impl Into<Vec<u8>>) -> KernelId {
        self.kernels.push(binary.into());
        KernelId((self.kernels.len() - 1) as u16)
    }

    pub fn add_record(&mut self, record: LinkRecord) -> &mut Self {
        self.records.push(record);
        self
    }

    pub fn finish(&self) -> Result<Vec<u8>, LinkError> {
        let imports = self.records.iter().filter(|r| !r.export).count();
        let exports = self.records.len() - imports;
        let mut link = Vec::with_capacity(LINK_HEADER_SIZE + self.records.len() * RECORD_SIZE);
        let size = LINK_HEADER_SIZE + self.records.len() * RECORD_SIZE;
        link.write_u32::<LittleEndian>(LINK_FILE_VERSION)?;
        link.write_u32::<LittleEndian>(size as u32)?;
        link.write_u32::<LittleEndian>(imports as u32)?;
        link.write_u32::<LittleEndian>(exports as u32)?;
        for r in &self.records {
            let [w0, w1] = r.encode();
            link.write_u32::<LittleEndian>(w0)?;
            link.write_u32::<LittleEndian>(w1)?;
        }

        let components: Vec<&[u8]> = self
            .kernels
            .iter()
            .map(Vec::as_slice)
            .chain(Some(link.as_slice()))
            .collect();
        let table = 4 * (components.len() + 1);
        let total = table + components.iter().map(|c| c.len()).sum::<usize>();
        let mut blob = Vec::with_capacity(total);
        let mut offset = table;
        blob.write_u32::<LittleEndian>(offset as u32)?;
        for c in &components {
            offset += c.len();
            blob.write_u32::<LittleEndian>(offset as u32)?;
        }
        for c in &components {
            blob.extend_from_slice(c);
        }
        Ok(blob)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<u8> {
        let mut w = BlobWriter::new();
        let a = w.add_kernel(vec![0xAA; 32]);
        let b = w.add_kernel(vec![0xBB; 16]);
        w.add_record(LinkRecord::import(a, LabelId(7), 2));
        w.add_record(LinkRecord::export(b, LabelId(7), 0));
        w.finish().unwrap()
    }

    #[test]
    fn writer_output_parses() {
        let repo = ComponentRepository::from_bytes(&sample()).unwrap();
        assert_eq!(repo.len(), 2);
        assert_eq!(repo.kernel(KernelId(0)).unwrap(), &[0xAA; 32][..]);
        assert_eq!(repo.kernel(KernelId(1)).unwrap().len(), 16);
        assert_eq!(repo.records(KernelId(0)).len(), 1);
        assert_eq!(repo.exporter(LabelId(7)), Some((KernelId(1), 0)));
        assert_eq!(repo.exporter(LabelId(8)), None);
        assert!(matches!(
            repo.kernel(KernelId(2)),
            Err(LinkError::InvalidKernel(KernelId(2)))
        ));
    }

    #[test]
    fn offset_table_layout() {
        let blob = sample();
        // 3 components (2 kernels + link file) -> 4 offsets.
        assert_eq!(&blob[0..4], &16u32.to_le_bytes());
        assert_eq!(&blob[4..8], &48u32.to_le_bytes());
        assert_eq!(&blob[8..12], &64u32.to_le_bytes());
        assert_eq!(blob.len(), 64 + 16 + 2 * RECORD_SIZE);
    }

    #[test]
    fn rejects_truncated_blobs() {
        let blob = sample();
        assert!(ComponentRepository::from_bytes(&blob[..2]).is_err());
        assert!(matches!(
            ComponentRepository::from_bytes(&blob[..blob.len() - 1]),
            Err(LinkError::MalformedBlob(_))
        ));
        assert!(matches!(
            ComponentRepository::from_bytes(&[4, 0, 0, 0]),
            Err(LinkError::MalformedBlob(_))
        ));
    }

    #[test]
    fn rejects_symbol_outside_kernel() {
        let mut w = BlobWriter::new();
        let a = w.add_kernel(vec![0; 8]);
        w.add_record(LinkRecord::export(a, LabelId(1), 4));
        assert!(matches!(
            ComponentRepository::from_bytes(&w.finish().unwrap()),
            Err(LinkError::MalformedBlob(_))
        ));

        let mut w = BlobWriter::new();
        w.add_kernel(vec![0; 8]);
        w.add_record(LinkRecord::export(KernelId(3), LabelId(1), 0));
        assert!(matches!(
            ComponentRepository::from_bytes(&w.finish().unwrap()),
            Err(LinkError::InvalidKernel(KernelId(3)))
        ));
    }
}
