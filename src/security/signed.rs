//! Signed-value codec: `payload|base64url(HMAC-SHA256(key, payload))`.

// crates.io
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use hmac::{Hmac, Mac};
use sha2::Sha256;
// self
use crate::_prelude::*;

type HmacSha256 = Hmac<Sha256>;

/// Separator between the payload and its tag.
pub const SIGNED_VALUE_DELIMITER: char = '|';
/// Minimum accepted key length in bytes.
pub const MIN_SIGNING_KEY_LEN: usize = 32;

const TAG_LEN: usize = 32;

/// Errors raised while constructing a [`SigningKey`].
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum SigningKeyError {
	/// Key material is shorter than [`MIN_SIGNING_KEY_LEN`].
	#[error("Signing key must be at least {min} bytes, got {actual}.")]
	TooShort {
		/// Required minimum length.
		min: usize,
		/// Supplied length.
		actual: usize,
	},
	/// The MAC implementation rejected the key material.
	#[error("Signing key was rejected by the MAC implementation.")]
	Rejected,
}

/// Errors raised while signing a payload.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum SigningError {
	/// The payload contains the delimiter and would not verify after signing.
	#[error("Payload contains the signed-value delimiter.")]
	DelimiterInPayload,
	/// The value could not be encoded into a signable payload.
	#[error("Failed to encode signed payload: {message}.")]
	Encode {
		/// Encoder failure message.
		message: String,
	},
}

/// HMAC-SHA256 key material.
///
/// A key holds a pre-keyed MAC state, so signing and verifying only clone it. Use
/// [`SigningKey::namespaced`] to give each cookie its own signing namespace over the same
/// master secret.
#[derive(Clone)]
pub struct SigningKey {
	mac: HmacSha256,
}
impl SigningKey {
	/// Validates and wraps raw key material.
	pub fn new(material: impl AsRef<[u8]>) -> Result<Self, SigningKeyError> {
		let material = material.as_ref();

		if material.len() < MIN_SIGNING_KEY_LEN {
			return Err(SigningKeyError::TooShort {
				min: MIN_SIGNING_KEY_LEN,
				actual: material.len(),
			});
		}

		let mac = HmacSha256::new_from_slice(material).map_err(|_| SigningKeyError::Rejected)?;

		Ok(Self { mac })
	}

	/// Derives an independent key, `HMAC-SHA256(self, label)`, for one signing namespace.
	pub fn namespaced(&self, label: &str) -> Result<Self, SigningKeyError> {
		Self::new(self.tag(label))
	}

	fn tag(&self, payload: &str) -> [u8; TAG_LEN] {
		let mut mac = self.mac.clone();

		mac.update(payload.as_bytes());

		let mut tag = [0_u8; TAG_LEN];

		tag.copy_from_slice(&mac.finalize().into_bytes());

		tag
	}

	fn verify_tag(&self, payload: &str, tag: &[u8]) -> bool {
		let mut mac = self.mac.clone();

		mac.update(payload.as_bytes());

		mac.verify_slice(tag).is_ok()
	}
}
impl Debug for SigningKey {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("SigningKey(<redacted>)")
	}
}

/// A payload paired with its integrity tag.
#[derive(Clone, PartialEq, Eq)]
pub struct SignedValue {
	/// Signed payload.
	pub payload: String,
	/// `HMAC-SHA256(key, payload)`.
	pub tag: [u8; TAG_LEN],
}
impl SignedValue {
	/// Signs `payload` with `key`.
	pub fn new(payload: impl Into<String>, key: &SigningKey) -> Result<Self, SigningError> {
		let payload = payload.into();

		if payload.contains(SIGNED_VALUE_DELIMITER) {
			return Err(SigningError::DelimiterInPayload);
		}

		let tag = key.tag(&payload);

		Ok(Self { payload, tag })
	}

	/// Splits a serialized value without checking the tag.
	///
	/// Returns `None` unless the input holds exactly one delimiter and a tag of the right size.
	pub fn parse(raw: &str) -> Option<Self> {
		let (payload, encoded_tag) = raw.split_once(SIGNED_VALUE_DELIMITER)?;

		if encoded_tag.contains(SIGNED_VALUE_DELIMITER) {
			return None;
		}

		let tag = URL_SAFE_NO_PAD.decode(encoded_tag).ok()?.try_into().ok()?;

		Some(Self { payload: payload.to_owned(), tag })
	}

	/// Recomputes the tag over the payload and compares it in constant time.
	pub fn is_authentic(&self, key: &SigningKey) -> bool {
		key.verify_tag(&self.payload, &self.tag)
	}

	/// Serializes as `payload|base64url(tag)`.
	pub fn encode(&self) -> String {
		format!("{}{SIGNED_VALUE_DELIMITER}{}", self.payload, URL_SAFE_NO_PAD.encode(self.tag))
	}
}
impl Debug for SignedValue {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("SignedValue").field("payload", &self.payload).finish_non_exhaustive()
	}
}
impl Display for SignedValue {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.encode())
	}
}

/// Signs `payload`, returning the serialized signed value.
pub fn sign(payload: &str, key: &SigningKey) -> Result<String, SigningError> {
	SignedValue::new(payload, key).map(|value| value.encode())
}

/// Verifies a serialized signed value and returns its payload.
///
/// Every failure (no delimiter, several delimiters, bad tag encoding, tag mismatch) yields
/// `None`; callers treat it exactly like an absent value.
pub fn verify(signed: &str, key: &SigningKey) -> Option<String> {
	let value = SignedValue::parse(signed)?;

	value.is_authentic(key).then_some(value.payload)
}
