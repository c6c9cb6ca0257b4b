// src/engine/layer_records.rs
//
// Layer records of a Photoshop document, read straight from the layer info
// section, and the layer tree they describe.
//
// Records are stored bottom-most first. A group is bracketed by a bounding
// divider (below its children) and a folder record (above them) that carries
// the group's name and flags.

use crate::engine::layered::LayerInfo;
use crate::error::MockupError;

type RecordResult<T> = std::result::Result<T, MockupError>;

pub const PSD_SIGNATURE: &[u8; 4] = b"8BPS";

/// Bytes after the signature and version in the file header.
const HEADER_REST_LEN: usize = 20;

/// Flag bit set on hidden layers.
const FLAG_HIDDEN: u8 = 0b0000_0010;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Section {
    /// Open or closed folder: the group's own record, above its children.
    Folder,
    /// Bounding divider below the group's children.
    Divider,
}

impl Section {
    fn from_code(code: u32) -> Option<Self> {
        match code {
            1 | 2 => Some(Self::Folder),
            3 => Some(Self::Divider),
            _ => None,
        }
    }
}

/// One record of the layer info section. `right` and `bottom` are exclusive.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LayerRecord {
    pub name: String,
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
    pub hidden: bool,
    pub section: Option<Section>,
}

impl LayerRecord {
    fn bounds(&self) -> Bounds {
        Bounds {
            left: self.left,
            top: self.top,
            right: self.right,
            bottom: self.bottom,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct Bounds {
    left: i32,
    top: i32,
    right: i32,
    bottom: i32,
}

impl Bounds {
    fn is_empty(&self) -> bool {
        self.right <= self.left || self.bottom <= self.top
    }

    fn union(self, other: Bounds) -> Bounds {
        Bounds {
            left: self.left.min(other.left),
            top: self.top.min(other.top),
            right: self.right.max(other.right),
            bottom: self.bottom.max(other.bottom),
        }
    }
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    fn take(&mut self, len: usize) -> RecordResult<&'a [u8]> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|&end| end <= self.bytes.len())
            .ok_or_else(|| {
                MockupError::layered_document(format!(
                    "layer data truncated at offset {} (wanted {len} bytes)",
                    self.pos
                ))
            })?;
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn skip(&mut self, len: usize) -> RecordResult<()> {
        self.take(len).map(|_| ())
    }

    /// Skip a block prefixed by its u32 length.
    fn skip_block(&mut self) -> RecordResult<()> {
        let len = self.u32()? as usize;
        self.skip(len)
    }

    fn u8(&mut self) -> RecordResult<u8> {
        Ok(self.take(1)?[0])
    }

    fn u16(&mut self) -> RecordResult<u16> {
        let b = self.take(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    fn i16(&mut self) -> RecordResult<i16> {
        let b = self.take(2)?;
        Ok(i16::from_be_bytes([b[0], b[1]]))
    }

    fn u32(&mut self) -> RecordResult<u32> {
        let b = self.take(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn i32(&mut self) -> RecordResult<i32> {
        let b = self.take(4)?;
        Ok(i32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// UTF-16BE string prefixed by its length in code units.
    fn unicode(&mut self) -> RecordResult<String> {
        let units = self.u32()? as usize;
        let raw = self.take(units.saturating_mul(2))?;
        let units: Vec<u16> = raw
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        Ok(String::from_utf16_lossy(&units)
            .trim_end_matches('\0')
            .to_string())
    }
}

/// Read every layer record of a Photoshop document, bottom-most first.
/// A document without a layer info section has no records.
pub fn read_layer_records(bytes: &[u8]) -> RecordResult<Vec<LayerRecord>> {
    let mut reader = Reader::new(bytes);
    if reader.take(4)? != PSD_SIGNATURE {
        return Err(MockupError::layered_document("missing 8BPS signature"));
    }
    let version = reader.u16()?;
    if version != 1 {
        return Err(MockupError::layered_document(format!(
            "unsupported document version {version}"
        )));
    }
    reader.skip(HEADER_REST_LEN)?;
    reader.skip_block()?; // color mode data
    reader.skip_block()?; // image resources

    if reader.u32()? == 0 {
        return Ok(Vec::new());
    }
    if reader.u32()? == 0 {
        return Ok(Vec::new());
    }
    // negative when the merged image carries transparency
    let count = reader.i16()?.unsigned_abs();
    (0..count).map(|_| read_record(&mut reader)).collect()
}

fn read_record(reader: &mut Reader<'_>) -> RecordResult<LayerRecord> {
    let top = reader.i32()?;
    let left = reader.i32()?;
    let bottom = reader.i32()?;
    let right = reader.i32()?;

    let channels = reader.u16()? as usize;
    reader.skip(channels * 6)?;
    reader.skip(8)?; // blend mode signature and key
    reader.skip(2)?; // opacity, clipping
    let flags = reader.u8()?;
    reader.skip(1)?; // filler

    let extra_len = reader.u32()? as usize;
    let mut extra = Reader::new(reader.take(extra_len)?);
    extra.skip_block()?; // layer mask
    extra.skip_block()?; // blending ranges

    // Pascal string padded to a multiple of 4 bytes
    let name_len = extra.u8()? as usize;
    let mut name = String::from_utf8_lossy(extra.take(name_len)?).into_owned();
    let padding = (4 - (name_len + 1) % 4) % 4;
    extra.skip(padding.min(extra.remaining()))?;

    let mut section = None;
    while extra.remaining() >= 12 {
        let signature = extra.take(4)?;
        if signature != b"8BIM" && signature != b"8B64" {
            break;
        }
        let key = extra.take(4)?;
        let len = extra.u32()? as usize;
        let mut data = Reader::new(extra.take(len.min(extra.remaining()))?);
        match key {
            b"luni" => name = data.unicode()?,
            b"lsct" | b"lsdk" => section = Section::from_code(data.u32()?),
            _ => {}
        }
    }

    Ok(LayerRecord {
        name,
        left,
        top,
        right,
        bottom,
        hidden: flags & FLAG_HIDDEN != 0,
        section,
    })
}

struct Node {
    record: LayerRecord,
    /// `Some` for groups.
    children: Option<Vec<Node>>,
}

impl Node {
    fn visible(&self) -> bool {
        !self.record.hidden
    }

    /// Area this node covers when everything above it is `shown`. A group
    /// covers the union of its visible descendants.
    fn extent(&self, shown: bool) -> Option<Bounds> {
        match &self.children {
            None => Some(self.record.bounds()).filter(|bounds| !bounds.is_empty()),
            Some(children) => {
                if !(shown && self.visible()) {
                    return None;
                }
                children
                    .iter()
                    .filter(|child| child.visible())
                    .filter_map(|child| child.extent(true))
                    .reduce(Bounds::union)
            }
        }
    }
}

fn build_tree(records: Vec<LayerRecord>) -> Vec<Node> {
    let mut levels: Vec<Vec<Node>> = vec![Vec::new()];
    for record in records {
        let node = match record.section {
            Some(Section::Divider) => {
                levels.push(Vec::new());
                continue;
            }
            Some(Section::Folder) => {
                let children = if levels.len() > 1 {
                    levels.pop().unwrap_or_default()
                } else {
                    Vec::new()
                };
                Node {
                    record,
                    children: Some(children),
                }
            }
            None => Node {
                record,
                children: None,
            },
        };
        if let Some(level) = levels.last_mut() {
            level.push(node);
        }
    }

    // a divider without its folder record: keep the members at the outer level
    while levels.len() > 1 {
        let orphans = levels.pop().unwrap_or_default();
        if let Some(level) = levels.last_mut() {
            level.extend(orphans);
        }
    }
    levels.pop().unwrap_or_default()
}

fn push_descendants(nodes: &[Node], shown: bool, out: &mut Vec<LayerInfo>) {
    for node in nodes {
        let bounds = match node.children {
            None => node.record.bounds(),
            Some(_) => node.extent(shown).unwrap_or_default(),
        };
        out.push(LayerInfo {
            name: node.record.name.clone(),
            left: bounds.left,
            top: bounds.top,
            right: bounds.right,
            bottom: bounds.bottom,
            visible: node.visible(),
        });
        if let Some(children) = &node.children {
            push_descendants(children, shown && node.visible(), out);
        }
    }
}

/// Depth-first layer listing, bottom-most first, each group before its
/// children. `visible` is the layer's own flag.
pub fn layer_listing(records: Vec<LayerRecord>) -> Vec<LayerInfo> {
    let tree = build_tree(records);
    let mut out = Vec::new();
    push_descendants(&tree, true, &mut out);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(name: &str, bounds: (i32, i32, i32, i32), hidden: bool) -> LayerRecord {
        LayerRecord {
            name: name.to_string(),
            left: bounds.0,
            top: bounds.1,
            right: bounds.2,
            bottom: bounds.3,
            hidden,
            section: None,
        }
    }

    fn divider() -> LayerRecord {
        LayerRecord {
            section: Some(Section::Divider),
            ..leaf("</Layer group>", (0, 0, 0, 0), false)
        }
    }

    fn folder(name: &str, hidden: bool) -> LayerRecord {
        LayerRecord {
            section: Some(Section::Folder),
            ..leaf(name, (0, 0, 0, 0), hidden)
        }
    }

    fn names(layers: &[LayerInfo]) -> Vec<&str> {
        layers.iter().map(|layer| layer.name.as_str()).collect()
    }

    fn bounds(layer: &LayerInfo) -> (i32, i32, i32, i32) {
        (layer.left, layer.top, layer.right, layer.bottom)
    }

    #[test]
    fn flat_records_keep_file_order() {
        let layers = layer_listing(vec![
            leaf("background", (0, 0, 100, 80), false),
            leaf("design", (10, 10, 60, 40), false),
        ]);
        assert_eq!(names(&layers), ["background", "design"]);
        assert_eq!(bounds(&layers[1]), (10, 10, 60, 40));
    }

    #[test]
    fn group_comes_before_children_with_union_bounds() {
        let layers = layer_listing(vec![
            divider(),
            leaf("left", (0, 0, 10, 10), false),
            leaf("right", (20, 5, 30, 25), false),
            leaf("off", (50, 50, 90, 90), true),
            folder("group", false),
            leaf("top", (0, 0, 5, 5), false),
        ]);
        assert_eq!(names(&layers), ["group", "left", "right", "off", "top"]);
        assert_eq!(bounds(&layers[0]), (0, 0, 30, 25));
        assert!(layers[0].visible);
        assert!(!layers[3].visible);
    }

    #[test]
    fn hidden_group_has_no_area_but_children_keep_own_flags() {
        let layers = layer_listing(vec![
            divider(),
            leaf("inside", (0, 0, 10, 10), false),
            folder("group", true),
        ]);
        assert_eq!(names(&layers), ["group", "inside"]);
        assert!(!layers[0].visible);
        assert_eq!(bounds(&layers[0]), (0, 0, 0, 0));
        assert!(layers[1].visible);
        assert_eq!(bounds(&layers[1]), (0, 0, 10, 10));
    }

    #[test]
    fn nested_groups_are_walked_depth_first() {
        let layers = layer_listing(vec![
            leaf("bottom", (0, 0, 4, 4), false),
            divider(),
            divider(),
            leaf("deep", (2, 2, 6, 6), false),
            folder("inner", false),
            leaf("shallow", (1, 1, 3, 3), false),
            folder("outer", false),
        ]);
        assert_eq!(
            names(&layers),
            ["bottom", "outer", "inner", "deep", "shallow"]
        );
        assert_eq!(bounds(&layers[1]), (1, 1, 6, 6));
        assert_eq!(bounds(&layers[2]), (2, 2, 6, 6));
    }

    #[test]
    fn empty_group_has_empty_bounds() {
        let layers = layer_listing(vec![divider(), folder("empty", false)]);
        assert_eq!(names(&layers), ["empty"]);
        assert_eq!(bounds(&layers[0]), (0, 0, 0, 0));
    }

    #[test]
    fn unbalanced_dividers_do_not_lose_layers() {
        let layers = layer_listing(vec![divider(), leaf("a", (0, 0, 1, 1), false)]);
        assert_eq!(names(&layers), ["a"]);

        let layers = layer_listing(vec![leaf("a", (0, 0, 1, 1), false), folder("g", false)]);
        assert_eq!(names(&layers), ["a", "g"]);
    }

    /// Header plus a layer info section holding `records`, no channel data.
    fn document(records: &[Vec<u8>]) -> Vec<u8> {
        let mut info = Vec::new();
        info.extend_from_slice(&(records.len() as i16).to_be_bytes());
        for record in records {
            info.extend_from_slice(record);
        }

        let mut bytes = Vec::new();
        bytes.extend_from_slice(PSD_SIGNATURE);
        bytes.extend_from_slice(&1u16.to_be_bytes());
        bytes.extend_from_slice(&[0; HEADER_REST_LEN]);
        bytes.extend_from_slice(&0u32.to_be_bytes());
        bytes.extend_from_slice(&0u32.to_be_bytes());
        bytes.extend_from_slice(&(info.len() as u32 + 4).to_be_bytes());
        bytes.extend_from_slice(&(info.len() as u32).to_be_bytes());
        bytes.extend_from_slice(&info);
        bytes
    }

    fn record(name: &str, ltrb: (i32, i32, i32, i32), flags: u8, extra: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        for value in [ltrb.1, ltrb.0, ltrb.3, ltrb.2] {
            out.extend_from_slice(&value.to_be_bytes());
        }
        out.extend_from_slice(&0u16.to_be_bytes());
        out.extend_from_slice(b"8BIMnorm");
        out.extend_from_slice(&[255, 0, flags, 0]);

        let mut data = Vec::new();
        data.extend_from_slice(&0u32.to_be_bytes());
        data.extend_from_slice(&0u32.to_be_bytes());
        data.push(name.len() as u8);
        data.extend_from_slice(name.as_bytes());
        let padding = (4 - (name.len() + 1) % 4) % 4;
        data.extend(std::iter::repeat(0).take(padding));
        data.extend_from_slice(extra);

        out.extend_from_slice(&(data.len() as u32).to_be_bytes());
        out.extend_from_slice(&data);
        out
    }

    fn section_block(code: u32) -> Vec<u8> {
        let mut out = b"8BIMlsct".to_vec();
        out.extend_from_slice(&4u32.to_be_bytes());
        out.extend_from_slice(&code.to_be_bytes());
        out
    }

    #[test]
    fn reads_bounds_flags_and_sections() {
        let bytes = document(&[
            record("</Layer group>", (0, 0, 0, 0), 0b1_1000, &section_block(3)),
            record("Layer 1", (-4, 2, 9, 7), 0b1000, &[]),
            record("Shadow", (0, 0, 1, 1), 0b1010, &[]),
            record("group", (0, 0, 0, 0), 0b1_1010, &section_block(1)),
        ]);
        let records = read_layer_records(&bytes).unwrap();
        assert_eq!(records.len(), 4);
        assert_eq!(records[0].section, Some(Section::Divider));
        assert_eq!(
            records[1],
            LayerRecord {
                name: "Layer 1".to_string(),
                left: -4,
                top: 2,
                right: 9,
                bottom: 7,
                hidden: false,
                section: None,
            }
        );
        assert!(records[2].hidden);
        assert_eq!(records[3].section, Some(Section::Folder));
        assert!(records[3].hidden);
    }

    #[test]
    fn unicode_name_replaces_pascal_name() {
        let mut luni = b"8BIMluni".to_vec();
        luni.extend_from_slice(&12u32.to_be_bytes());
        luni.extend_from_slice(&4u32.to_be_bytes());
        for unit in "設計図".encode_utf16().chain([0]) {
            luni.extend_from_slice(&unit.to_be_bytes());
        }
        let bytes = document(&[record("x", (0, 0, 1, 1), 0b1000, &luni)]);
        let records = read_layer_records(&bytes).unwrap();
        assert_eq!(records[0].name, "設計図");
    }

    #[test]
    fn truncated_records_are_errors() {
        let bytes = document(&[record("Layer 1", (0, 0, 4, 4), 0, &[])]);
        for len in [30, 40, bytes.len() - 3] {
            let err = read_layer_records(&bytes[..len]).unwrap_err();
            assert_eq!(err.kind(), "LayeredDocumentError");
        }
        assert!(read_layer_records(b"8BPX").is_err());
    }

    #[test]
    fn document_without_layer_section_has_no_records() {
        let mut bytes = PSD_SIGNATURE.to_vec();
        bytes.extend_from_slice(&1u16.to_be_bytes());
        bytes.extend_from_slice(&[0; HEADER_REST_LEN]);
        bytes.extend_from_slice(&[0; 12]);
        assert!(read_layer_records(&bytes).unwrap().is_empty());
    }
}
