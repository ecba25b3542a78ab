use bitstream_io::{BigEndian, BitRead, BitReader, BitWrite, BitWriter};

use crate::error::{DnsError, Result};

/// Length of the fixed message header
pub const HEADER_LEN: usize = 12;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DnsHeader {
    pub id: u16,
    pub qr: bool,
    pub opcode: u8,
    pub aa: bool,
    pub tc: bool,
    pub rd: bool,
    pub ra: bool,
    pub z: u8,
    pub rcode: u8,
    pub qdcount: u16,
    pub ancount: u16,
    pub nscount: u16,
    pub arcount: u16,
}

impl DnsHeader {
    /// Read the header from the start of a message.
    pub fn parse(msg: &[u8]) -> Result<Self> {
        if msg.len() < HEADER_LEN {
            return Err(DnsError::BufferTooSmall {
                need: HEADER_LEN,
                have: msg.len(),
            });
        }
        let mut reader = BitReader::<_, BigEndian>::new(&msg[0..HEADER_LEN]);
        Ok(Self {
            id: reader.read_var::<u16>(16)?,
            qr: reader.read_var::<u8>(1)? == 1,
            opcode: reader.read_var::<u8>(4)?,
            aa: reader.read_var::<u8>(1)? == 1,
            tc: reader.read_var::<u8>(1)? == 1,
            rd: reader.read_var::<u8>(1)? == 1,
            ra: reader.read_var::<u8>(1)? == 1,
            z: reader.read_var::<u8>(3)?,
            rcode: reader.read_var::<u8>(4)?,
            qdcount: reader.read_var::<u16>(16)?,
            ancount: reader.read_var::<u16>(16)?,
            nscount: reader.read_var::<u16>(16)?,
            arcount: reader.read_var::<u16>(16)?,
        })
    }

    /// Append the 12 header bytes to `buf`.
    pub fn compose(&self, buf: &mut Vec<u8>) -> Result<()> {
        let mut writer: BitWriter<&mut Vec<u8>, BigEndian> = BitWriter::new(buf);
        writer.write_var::<u16>(16, self.id)?;
        writer.write_var::<u8>(1, self.qr as u8)?;
        writer.write_var::<u8>(4, self.opcode)?;
        writer.write_var::<u8>(1, self.aa as u8)?;
        writer.write_var::<u8>(1, self.tc as u8)?;
        writer.write_var::<u8>(1, self.rd as u8)?;
        writer.write_var::<u8>(1, self.ra as u8)?;
        writer.write_var::<u8>(3, self.z)?;
        writer.write_var::<u8>(4, self.rcode)?;
        writer.write_var::<u16>(16, self.qdcount)?;
        writer.write_var::<u16>(16, self.ancount)?;
        writer.write_var::<u16>(16, self.nscount)?;
        writer.write_var::<u16>(16, self.arcount)?;
        Ok(())
    }

    /// Overwrite the header at the start of `msg` in place.
    pub fn write_over(&self, msg: &mut [u8]) -> Result<()> {
        if msg.len() < HEADER_LEN {
            return Err(DnsError::BufferTooSmall {
                need: HEADER_LEN,
                have: msg.len(),
            });
        }
        let mut buf = Vec::with_capacity(HEADER_LEN);
        self.compose(&mut buf)?;
        msg[..HEADER_LEN].copy_from_slice(&buf);
        Ok(())
    }
}
