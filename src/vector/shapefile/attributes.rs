/*
This file is part of the geoshp shapefile library.
Authors: geoshp contributors
Created: 18/10/2026
Last Modified: 18/10/2026
License: MIT

NOTE: Structures and functions for handling the Shapefile attribute table
contained within the associated .dbf file.
*/
use crate::error::{Result, ShapefileError};
use crate::utils::{ByteOrderReader, Endianness};
use byteorder::{LittleEndian, WriteBytesExt};
use chrono::{Datelike, Local, NaiveDate};
use std::fmt;
use std::io::prelude::*;
use tracing::warn;

const DESCRIPTOR_SIZE: usize = 32;
const HEADER_TERMINATOR: u8 = 0x0D;
const FILE_TERMINATOR: u8 = 0x1A;
const ACTIVE_FLAG: u8 = b' ';
const DELETED_FLAG: u8 = b'*';

#[derive(Debug, Default, Clone, PartialEq)]
pub struct AttributeHeader {
    pub version: u8,
    pub year: u32,
    pub month: u8,
    pub day: u8,
    pub num_records: u32,
    pub num_fields: u32, // not actually stored in file but derived
    pub bytes_in_header: u16,
    pub bytes_in_record: u16,
    pub incomplete_transaction: u8,
    pub encryption_flag: u8,
    pub mdx_flag: u8,
    pub language_driver_id: u8,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct DateData {
    pub year: u16,
    pub month: u8,
    pub day: u8,
}

impl DateData {
    pub fn to_naive_date(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year as i32, self.month as u32, self.day as u32)
    }
}

impl From<NaiveDate> for DateData {
    fn from(date: NaiveDate) -> DateData {
        DateData {
            year: date.year() as u16,
            month: date.month() as u8,
            day: date.day() as u8,
        }
    }
}

impl fmt::Display for DateData {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:04}{:02}{:02}", self.year, self.month, self.day)
    }
}

/// A single attribute cell.
///
/// `Blank` holds a cell that was entirely whitespace on disk, kept verbatim.
/// `Bool(None)` is the dBASE "unknown" logical, written as `?`.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldData {
    Int(i32),
    Int64(i64),
    Real(f64),
    Text(String),
    Date(DateData),
    Bool(Option<bool>),
    Blank(String),
    Null,
}

impl FieldData {
    pub fn is_null(&self) -> bool {
        matches!(self, FieldData::Null | FieldData::Blank(_))
    }
}

impl From<i32> for FieldData {
    fn from(v: i32) -> FieldData {
        FieldData::Int(v)
    }
}

impl From<i64> for FieldData {
    fn from(v: i64) -> FieldData {
        FieldData::Int64(v)
    }
}

impl From<f64> for FieldData {
    fn from(v: f64) -> FieldData {
        FieldData::Real(v)
    }
}

impl From<bool> for FieldData {
    fn from(v: bool) -> FieldData {
        FieldData::Bool(Some(v))
    }
}

impl From<&str> for FieldData {
    fn from(v: &str) -> FieldData {
        FieldData::Text(v.to_string())
    }
}

impl From<String> for FieldData {
    fn from(v: String) -> FieldData {
        FieldData::Text(v)
    }
}

impl From<DateData> for FieldData {
    fn from(v: DateData) -> FieldData {
        FieldData::Date(v)
    }
}

impl From<NaiveDate> for FieldData {
    fn from(v: NaiveDate) -> FieldData {
        FieldData::Date(DateData::from(v))
    }
}

impl fmt::Display for FieldData {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            FieldData::Int(v) => write!(f, "{}", v),
            FieldData::Int64(v) => write!(f, "{}", v),
            FieldData::Real(v) => write!(f, "{}", v),
            FieldData::Text(v) | FieldData::Blank(v) => write!(f, "{}", v),
            FieldData::Date(v) => write!(f, "{}", v),
            FieldData::Bool(Some(true)) => write!(f, "T"),
            FieldData::Bool(Some(false)) => write!(f, "F"),
            FieldData::Bool(None) => write!(f, "?"),
            FieldData::Null => write!(f, ""),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FieldDataType {
    Character,
    Number,
    Float,
    Date,
    Logical,
    Other(char),
}

impl FieldDataType {
    pub fn from_char(c: char) -> FieldDataType {
        match c {
            'C' => FieldDataType::Character,
            'N' => FieldDataType::Number,
            'F' => FieldDataType::Float,
            'D' => FieldDataType::Date,
            'L' => FieldDataType::Logical,
            _ => FieldDataType::Other(c),
        }
    }

    pub fn to_char(&self) -> char {
        match self {
            FieldDataType::Character => 'C',
            FieldDataType::Number => 'N',
            FieldDataType::Float => 'F',
            FieldDataType::Date => 'D',
            FieldDataType::Logical => 'L',
            FieldDataType::Other(c) => *c,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, FieldDataType::Number | FieldDataType::Float)
    }
}

impl Default for FieldDataType {
    fn default() -> FieldDataType {
        FieldDataType::Character
    }
}

impl fmt::Display for FieldDataType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.to_char())
    }
}

/// A column descriptor of the attribute table.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct AttributeField {
    pub name: String,
    pub field_type: FieldDataType,
    pub field_length: u8,
    pub decimal_count: u8,
}

impl AttributeField {
    /// Creates a field descriptor. The name is normalised the way it will be
    /// stored: spaces become underscores and it is cut to 10 bytes.
    pub fn new(
        name: &str,
        field_type: FieldDataType,
        field_length: u8,
        decimal_count: u8,
    ) -> AttributeField {
        AttributeField {
            name: normalize_field_name(name),
            field_type,
            field_length,
            decimal_count,
        }
    }
}

impl fmt::Display for AttributeField {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} ({}, {}, {})",
            self.name, self.field_type, self.field_length, self.decimal_count
        )
    }
}

pub fn normalize_field_name(name: &str) -> String {
    let name = name.replace(' ', "_");
    truncate_to_bytes(&name, 10).to_string()
}

fn truncate_to_bytes(s: &str, max_len: usize) -> &str {
    if s.len() <= max_len {
        return s;
    }
    let mut end = max_len;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Random-access decoder for a .dbf stream.
pub struct DbfReader<R: Read + Seek> {
    bor: ByteOrderReader<R>,
    pub header: AttributeHeader,
    pub fields: Vec<AttributeField>,
    record_width: usize,
}

impl<R: Read + Seek> DbfReader<R> {
    pub fn new(reader: R) -> Result<DbfReader<R>> {
        let mut bor = ByteOrderReader::new(reader, Endianness::LittleEndian)?;
        if bor.len() < DESCRIPTOR_SIZE + 1 {
            return Err(ShapefileError::structural(format!(
                "dbf file is {} bytes, too short for a header",
                bor.len()
            )));
        }

        let mut header = AttributeHeader {
            version: bor.read_u8()?,
            year: 1900u32 + bor.read_u8()? as u32,
            month: bor.read_u8()?,
            day: bor.read_u8()?,
            num_records: bor.read_u32()?,
            bytes_in_header: bor.read_u16()?,
            bytes_in_record: bor.read_u16()?,
            ..Default::default()
        };
        // reserved bytes
        bor.inc_pos(2)?;
        header.incomplete_transaction = bor.read_u8()?;
        header.encryption_flag = bor.read_u8()?;
        // free record thread and multi-user dBASE bytes
        bor.inc_pos(12)?;
        header.mdx_flag = bor.read_u8()?;
        header.language_driver_id = bor.read_u8()?;
        bor.inc_pos(2)?;

        let header_len = header.bytes_in_header as usize;
        if header_len < DESCRIPTOR_SIZE + 1 {
            return Err(ShapefileError::structural(format!(
                "dbf header length {} is too small",
                header_len
            )));
        }
        let num_fields = (header_len - DESCRIPTOR_SIZE - 1) / DESCRIPTOR_SIZE;
        header.num_fields = num_fields as u32;

        let mut fields = Vec::with_capacity(num_fields);
        for _ in 0..num_fields {
            let raw_name = bor.read_bytes(11)?;
            let name_end = raw_name.iter().position(|b| *b == 0).unwrap_or(raw_name.len());
            let name = String::from_utf8_lossy(&raw_name[..name_end])
                .trim_start()
                .to_string();
            let field_type = FieldDataType::from_char(char::from(bor.read_u8()?));
            bor.inc_pos(4)?;
            let field_length = bor.read_u8()?;
            let decimal_count = bor.read_u8()?;
            bor.inc_pos(14)?;
            fields.push(AttributeField {
                name,
                field_type,
                field_length,
                decimal_count,
            });
        }

        let terminator = bor.read_u8()?;
        if terminator != HEADER_TERMINATOR {
            return Err(ShapefileError::structural(format!(
                "field descriptor array ends with 0x{:02X}, not 0x0D",
                terminator
            )));
        }

        let record_width = 1 + fields.iter().map(|f| f.field_length as usize).sum::<usize>();
        if record_width != header.bytes_in_record as usize {
            warn!(
                "dbf header declares {}-byte records but the fields add up to {}",
                header.bytes_in_record, record_width
            );
        }

        Ok(DbfReader {
            bor,
            header,
            fields,
            record_width,
        })
    }

    pub fn num_records(&self) -> usize {
        self.header.num_records as usize
    }

    /// Reads the row at `index`, or `None` if the row is flagged deleted.
    pub fn record(&mut self, index: usize) -> Result<Option<Vec<FieldData>>> {
        let offset = self.header.bytes_in_header as usize + index * self.record_width;
        self.bor.seek(offset)?;
        let raw = self.bor.read_bytes(self.record_width)?;
        decode_record(&self.fields, &raw)
    }

    /// Iterates over the rows, skipping deleted ones.
    pub fn records(&mut self) -> RecordIter<'_, R> {
        RecordIter {
            reader: self,
            index: 0,
            failed: false,
        }
    }
}

pub struct RecordIter<'a, R: Read + Seek> {
    reader: &'a mut DbfReader<R>,
    index: usize,
    failed: bool,
}

impl<'a, R: Read + Seek> Iterator for RecordIter<'a, R> {
    type Item = Result<Vec<FieldData>>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.failed && self.index < self.reader.num_records() {
            let i = self.index;
            self.index += 1;
            match self.reader.record(i) {
                Ok(Some(rec)) => return Some(Ok(rec)),
                Ok(None) => continue,
                Err(e) => {
                    self.failed = true;
                    return Some(Err(e));
                }
            }
        }
        None
    }
}

fn decode_record(fields: &[AttributeField], raw: &[u8]) -> Result<Option<Vec<FieldData>>> {
    if raw.first() != Some(&ACTIVE_FLAG) {
        return Ok(None);
    }
    let mut rec = Vec::with_capacity(fields.len());
    let mut pos = 1;
    for field in fields {
        let end = pos + field.field_length as usize;
        let cell = raw.get(pos..end).ok_or_else(|| {
            ShapefileError::structural(format!("record too short for field '{}'", field.name))
        })?;
        rec.push(decode_cell(field, cell)?);
        pos = end;
    }
    Ok(Some(rec))
}

fn decode_cell(field: &AttributeField, raw: &[u8]) -> Result<FieldData> {
    let text = String::from_utf8_lossy(raw);
    if text.trim().is_empty() {
        return Ok(FieldData::Blank(text.into_owned()));
    }
    let value = match field.field_type {
        FieldDataType::Number | FieldDataType::Float => {
            let s = text.replace('\0', "");
            let s = s.trim();
            if s.is_empty() {
                FieldData::Int(0)
            } else if field.decimal_count > 0 {
                FieldData::Real(parse_real(field, s)?)
            } else if let Ok(v) = s.parse::<i64>() {
                match i32::try_from(v) {
                    Ok(v) => FieldData::Int(v),
                    Err(_) => FieldData::Int64(v),
                }
            } else {
                FieldData::Real(parse_real(field, s)?)
            }
        }
        FieldDataType::Date => {
            let part = |r: std::ops::Range<usize>| text.get(r).map(|v| v.trim());
            let ymd = (
                part(0..4).and_then(|v| v.parse::<u16>().ok()),
                part(4..6).and_then(|v| v.parse::<u8>().ok()),
                part(6..8).and_then(|v| v.parse::<u8>().ok()),
            );
            match ymd {
                (Some(year), Some(month), Some(day)) => {
                    FieldData::Date(DateData { year, month, day })
                }
                _ => FieldData::Text(text.trim().to_string()),
            }
        }
        FieldDataType::Logical => match text.trim().chars().next() {
            Some('Y' | 'y' | 'T' | 't') => FieldData::Bool(Some(true)),
            Some('N' | 'n' | 'F' | 'f') => FieldData::Bool(Some(false)),
            _ => FieldData::Bool(None),
        },
        FieldDataType::Character | FieldDataType::Other(_) => FieldData::Text(text.trim().to_string()),
    };
    Ok(value)
}

fn parse_real(field: &AttributeField, s: &str) -> Result<f64> {
    s.parse::<f64>().map_err(|_| {
        ShapefileError::structural(format!(
            "'{}' in numeric field '{}' is not a number",
            s, field.name
        ))
    })
}

/// Renders one cell to exactly `field_length` bytes.
fn encode_cell(field: &AttributeField, value: &FieldData) -> std::result::Result<String, String> {
    let size = field.field_length as usize;
    let rendered = match field.field_type {
        FieldDataType::Number | FieldDataType::Float => {
            let dc = field.decimal_count as usize;
            let s = match value {
                FieldData::Int(v) => v.to_string(),
                FieldData::Int64(v) => v.to_string(),
                FieldData::Real(v) if dc > 0 => format!("{:.*}", dc, v),
                FieldData::Real(v) => v.to_string(),
                FieldData::Text(v) => {
                    let t = v.trim();
                    if t.parse::<f64>().is_err() {
                        return Err(format!("'{}' is not a number", v));
                    }
                    t.to_string()
                }
                FieldData::Null | FieldData::Blank(_) => String::new(),
                other => return Err(format!("'{}' is not a number", other)),
            };
            format!("{:>width$}", s, width = size)
        }
        FieldDataType::Logical => match value {
            FieldData::Null | FieldData::Blank(_) => " ".to_string(),
            FieldData::Text(v) => match v.chars().next() {
                Some(c) => c.to_uppercase().to_string(),
                None => " ".to_string(),
            },
            other => other.to_string(),
        },
        _ => {
            let s = value.to_string();
            let mut cell = truncate_to_bytes(&s, size).to_string();
            // pad by bytes, not chars
            while cell.len() < size {
                cell.push(' ');
            }
            cell
        }
    };
    if rendered.len() != size {
        return Err(format!(
            "rendered value '{}' is {} bytes wide, field is {}",
            rendered,
            rendered.len(),
            size
        ));
    }
    Ok(rendered)
}

/// Encodes a complete .dbf file in memory. Nothing is returned unless every
/// row encodes, so a failure never leaves a partial file behind.
pub fn encode_dbf(
    version: u8,
    fields: &[AttributeField],
    records: &[Vec<FieldData>],
    deleted: &[bool],
) -> Result<Vec<u8>> {
    let header_size = DESCRIPTOR_SIZE * (fields.len() + 1) + 1;
    let record_width = 1 + fields.iter().map(|f| f.field_length as usize).sum::<usize>();
    if header_size > u16::MAX as usize || record_width > u16::MAX as usize {
        return Err(ShapefileError::structural(format!(
            "{} fields do not fit in a dbf header",
            fields.len()
        )));
    }

    let mut body: Vec<u8> = Vec::with_capacity(records.len() * record_width + 1);
    for (i, rec) in records.iter().enumerate() {
        let is_deleted = deleted.get(i).copied().unwrap_or(false);
        body.push(if is_deleted { DELETED_FLAG } else { ACTIVE_FLAG });
        for (j, field) in fields.iter().enumerate() {
            let value = rec.get(j).unwrap_or(&FieldData::Null);
            let cell = encode_cell(field, value).map_err(|message| ShapefileError::Encoding {
                record: i,
                field: field.name.clone(),
                message,
            })?;
            body.extend_from_slice(cell.as_bytes());
        }
    }
    body.push(FILE_TERMINATOR);

    let mut writer: Vec<u8> = Vec::with_capacity(header_size + body.len());
    writer.write_u8(version)?;

    let now = Local::now();
    writer.write_u8((now.year() - 1900) as u8)?;
    writer.write_u8(now.month() as u8)?;
    writer.write_u8(now.day() as u8)?;

    writer.write_u32::<LittleEndian>(records.len() as u32)?;
    writer.write_u16::<LittleEndian>(header_size as u16)?;
    writer.write_u16::<LittleEndian>(record_width as u16)?;

    // reserved or unused bytes
    for _ in 0..20 {
        writer.write_u8(0u8)?;
    }

    // field descriptor array
    for field in fields {
        let name = normalize_field_name(&field.name);
        writer.write_all(name.as_bytes())?;
        for _ in name.len()..11 {
            writer.write_u8(0u8)?;
        }
        writer.write_u8(field.field_type.to_char() as u8)?;
        for _ in 0..4 {
            writer.write_u8(0u8)?;
        }
        writer.write_u8(field.field_length)?;
        writer.write_u8(field.decimal_count)?;
        for _ in 0..14 {
            writer.write_u8(0u8)?;
        }
    }
    writer.write_u8(HEADER_TERMINATOR)?;
    writer.extend_from_slice(&body);

    Ok(writer)
}
