// Key Format
// DER and PEM encoding of RSA keys (PKCS#1 RSAPublicKey / RSAPrivateKey)

use crate::rsa::{PublicKeyParts, RsaBigInt, RsaError, RsaPrivateKey, RsaPublicKey};
use base64::{engine::general_purpose, Engine};
use thiserror::Error;
use zeroize::{Zeroize, Zeroizing};

const TAG_INTEGER: u8 = 0x02;
const TAG_SEQUENCE: u8 = 0x30;

pub const PUBLIC_KEY_LABEL: &str = "RSA PUBLIC KEY";
pub const PRIVATE_KEY_LABEL: &str = "RSA PRIVATE KEY";

const PEM_LINE_WIDTH: usize = 64;

#[derive(Debug, Error)]
pub enum KeyFormatError {
    #[error("malformed DER: {0}")]
    Der(&'static str),

    #[error("malformed PEM: {0}")]
    Pem(&'static str),

    #[error("expected a PEM block labelled {expected}, found {found}")]
    WrongLabel { expected: &'static str, found: String },

    #[error("unsupported private key version {0}")]
    UnsupportedVersion(u64),

    #[error("base64 decode error: {0}")]
    Base64Decode(#[from] base64::DecodeError),

    #[error("invalid key: {0}")]
    Rsa(#[from] RsaError),
}

pub type KeyFormatResult<T> = Result<T, KeyFormatError>;

fn encode_length(len: usize, out: &mut Vec<u8>) {
    if len < 0x80 {
        out.push(len as u8);
        return;
    }
    let bytes = len.to_be_bytes();
    let skip = bytes.iter().take_while(|&&b| b == 0).count();
    out.push(0x80 | (bytes.len() - skip) as u8);
    out.extend_from_slice(&bytes[skip..]);
}

fn encode_integer(value: &RsaBigInt, out: &mut Vec<u8>) {
    let mut content = value.to_bytes_be(1);
    // high bit set would read back as negative
    if content[0] & 0x80 != 0 {
        content.insert(0, 0);
    }
    out.push(TAG_INTEGER);
    encode_length(content.len(), out);
    out.extend_from_slice(&content);
    content.zeroize();
}

fn encode_sequence(values: &[&RsaBigInt]) -> Vec<u8> {
    let mut body = Vec::new();
    for value in values {
        encode_integer(value, &mut body);
    }
    let mut out = Vec::with_capacity(body.len() + 6);
    out.push(TAG_SEQUENCE);
    encode_length(body.len(), &mut out);
    out.extend_from_slice(&body);
    body.zeroize();
    out
}

/// Cursor over a DER byte string
struct DerReader<'a> {
    data: &'a [u8],
}

impl<'a> DerReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    fn read_byte(&mut self) -> KeyFormatResult<u8> {
        let (&first, rest) = self
            .data
            .split_first()
            .ok_or(KeyFormatError::Der("unexpected end of input"))?;
        self.data = rest;
        Ok(first)
    }

    fn read_length(&mut self) -> KeyFormatResult<usize> {
        let first = self.read_byte()?;
        if first < 0x80 {
            return Ok(first as usize);
        }
        let count = (first & 0x7f) as usize;
        if count == 0 || count > std::mem::size_of::<usize>() {
            return Err(KeyFormatError::Der("unsupported length encoding"));
        }
        let mut len = 0usize;
        for i in 0..count {
            let b = self.read_byte()?;
            if i == 0 && b == 0 {
                return Err(KeyFormatError::Der("non-minimal length"));
            }
            len = (len << 8) | b as usize;
        }
        if len < 0x80 {
            return Err(KeyFormatError::Der("non-minimal length"));
        }
        Ok(len)
    }

    fn read_tlv(&mut self, tag: u8) -> KeyFormatResult<&'a [u8]> {
        if self.read_byte()? != tag {
            return Err(KeyFormatError::Der("unexpected tag"));
        }
        let len = self.read_length()?;
        if len > self.data.len() {
            return Err(KeyFormatError::Der("length exceeds input"));
        }
        let (content, rest) = self.data.split_at(len);
        self.data = rest;
        Ok(content)
    }

    fn read_integer(&mut self) -> KeyFormatResult<RsaBigInt> {
        let content = self.read_tlv(TAG_INTEGER)?;
        match content {
            [] => Err(KeyFormatError::Der("empty integer")),
            [first, ..] if first & 0x80 != 0 => Err(KeyFormatError::Der("negative integer")),
            [0, second, ..] if second & 0x80 == 0 => Err(KeyFormatError::Der("non-minimal integer")),
            _ => Ok(RsaBigInt::from_bytes_be(content)),
        }
    }

    fn read_sequence(&mut self) -> KeyFormatResult<DerReader<'a>> {
        self.read_tlv(TAG_SEQUENCE).map(DerReader::new)
    }

    fn finish(&self) -> KeyFormatResult<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(KeyFormatError::Der("trailing data"))
        }
    }
}

/// RSAPublicKey ::= SEQUENCE { modulus, publicExponent }
pub fn public_key_to_der(key: &RsaPublicKey) -> Vec<u8> {
    encode_sequence(&[key.n(), key.e()])
}

pub fn public_key_from_der(der: &[u8]) -> KeyFormatResult<RsaPublicKey> {
    let mut outer = DerReader::new(der);
    let mut seq = outer.read_sequence()?;
    outer.finish()?;

    let n = seq.read_integer()?;
    let e = seq.read_integer()?;
    seq.finish()?;
    Ok(RsaPublicKey::new(n, e)?)
}

/// RSAPrivateKey ::= SEQUENCE { version(0), n, e, d, p, q, dP, dQ, qInv }
pub fn private_key_to_der(key: &RsaPrivateKey) -> Zeroizing<Vec<u8>> {
    let version = RsaBigInt::zero();
    Zeroizing::new(encode_sequence(&[
        &version,
        key.n(),
        key.e(),
        key.d(),
        key.p(),
        key.q(),
        key.d_p(),
        key.d_q(),
        key.q_inv(),
    ]))
}

/// Parse a two-prime private key.
///
/// The CRT values in the encoding are recomputed from `d`, `p` and `q` and
/// must match.
pub fn private_key_from_der(der: &[u8]) -> KeyFormatResult<RsaPrivateKey> {
    let mut outer = DerReader::new(der);
    let mut seq = outer.read_sequence()?;
    outer.finish()?;

    let version = seq.read_integer()?;
    if !version.is_zero() {
        return Err(KeyFormatError::UnsupportedVersion(version.to_u64().unwrap_or(u64::MAX)));
    }

    let n = seq.read_integer()?;
    let e = seq.read_integer()?;
    let d = seq.read_integer()?;
    let p = seq.read_integer()?;
    let q = seq.read_integer()?;
    let mut d_p = seq.read_integer()?;
    let mut d_q = seq.read_integer()?;
    let mut q_inv = seq.read_integer()?;
    seq.finish()?;

    let key = RsaPrivateKey::from_components(n, e, d, p, q)?;
    let consistent = &d_p == key.d_p() && &d_q == key.d_q() && &q_inv == key.q_inv();
    d_p.zeroize();
    d_q.zeroize();
    q_inv.zeroize();
    if !consistent {
        return Err(RsaError::InvalidKey("CRT values do not match the prime factors").into());
    }
    Ok(key)
}

pub fn encode_pem(label: &str, der: &[u8]) -> String {
    let body = general_purpose::STANDARD.encode(der);
    let mut pem = String::with_capacity(body.len() + body.len() / PEM_LINE_WIDTH + 2 * label.len() + 40);
    pem.push_str(&format!("-----BEGIN {}-----\n", label));
    for (i, c) in body.chars().enumerate() {
        if i > 0 && i % PEM_LINE_WIDTH == 0 {
            pem.push('\n');
        }
        pem.push(c);
    }
    if !body.is_empty() {
        pem.push('\n');
    }
    pem.push_str(&format!("-----END {}-----\n", label));
    pem
}

/// Returns the label and the decoded body of the first PEM block
pub fn decode_pem(pem: &str) -> KeyFormatResult<(String, Vec<u8>)> {
    let mut lines = pem.lines().map(str::trim).skip_while(|line| line.is_empty());

    let header = lines.next().ok_or(KeyFormatError::Pem("empty input"))?;
    let label = header
        .strip_prefix("-----BEGIN ")
        .and_then(|rest| rest.strip_suffix("-----"))
        .ok_or(KeyFormatError::Pem("missing BEGIN line"))?;

    let footer = format!("-----END {}-----", label);
    let mut body = String::new();
    let mut terminated = false;
    for line in lines {
        if line == footer {
            terminated = true;
            break;
        }
        if line.starts_with("-----") {
            return Err(KeyFormatError::Pem("mismatched END line"));
        }
        body.push_str(line);
    }
    if !terminated {
        return Err(KeyFormatError::Pem("missing END line"));
    }

    let der = general_purpose::STANDARD.decode(body.as_bytes());
    body.zeroize();
    Ok((label.to_string(), der?))
}

fn decode_pem_expecting(pem: &str, expected: &'static str) -> KeyFormatResult<Zeroizing<Vec<u8>>> {
    let (label, der) = decode_pem(pem)?;
    let der = Zeroizing::new(der);
    if label != expected {
        return Err(KeyFormatError::WrongLabel {
            expected,
            found: label,
        });
    }
    Ok(der)
}

pub fn public_key_to_pem(key: &RsaPublicKey) -> String {
    encode_pem(PUBLIC_KEY_LABEL, &public_key_to_der(key))
}

pub fn public_key_from_pem(pem: &str) -> KeyFormatResult<RsaPublicKey> {
    let der = decode_pem_expecting(pem, PUBLIC_KEY_LABEL)?;
    public_key_from_der(&der)
}

pub fn private_key_to_pem(key: &RsaPrivateKey) -> Zeroizing<String> {
    Zeroizing::new(encode_pem(PRIVATE_KEY_LABEL, &private_key_to_der(key)))
}

pub fn private_key_from_pem(pem: &str) -> KeyFormatResult<RsaPrivateKey> {
    let der = decode_pem_expecting(pem, PRIVATE_KEY_LABEL)?;
    private_key_from_der(&der)
}
