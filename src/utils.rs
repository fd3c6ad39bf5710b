use blake2::{digest::consts::U32, Blake2b, Digest};

type Blake2b256 = Blake2b<U32>;

pub fn blake2_256<S: AsRef<[u8]>>(bytes: &[S]) -> [u8; 32] {
    //! Compute blake2b hash with 32-byte digest.
    //!
    //! Builds a hash iteratively by updating with every element
    //! of the input sequence.
    let mut hasher = Blake2b256::new();
    bytes.iter().for_each(|b| hasher.update(b));
    hasher.finalize().into()
}

/// Serde adapters for the `0x`-prefixed hex strings used by the Thor REST API.
pub(crate) mod unhex {
    use alloy::primitives::U256;
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};
    use serde_with::{DeserializeAs, SerializeAs};
    use std::marker::PhantomData;

    fn strip_0x(s: &str) -> &str {
        s.strip_prefix("0x").unwrap_or(s)
    }

    /// Byte strings as `0x`-prefixed hex.
    pub struct Hex;

    impl<T: AsRef<[u8]>> SerializeAs<T> for Hex {
        fn serialize_as<S: Serializer>(value: &T, serializer: S) -> Result<S::Ok, S::Error> {
            serializer.serialize_str(&format!("0x{}", alloy::hex::encode(value)))
        }
    }
    impl<'de, T: TryFrom<Vec<u8>>> DeserializeAs<'de, T> for Hex {
        fn deserialize_as<D: Deserializer<'de>>(deserializer: D) -> Result<T, D::Error> {
            let raw = String::deserialize(deserializer)?;
            let bytes = alloy::hex::decode(strip_0x(&raw)).map_err(D::Error::custom)?;
            T::try_from(bytes).map_err(|_| D::Error::custom("unexpected byte string length"))
        }
    }

    /// Unsigned integers as `0x`-prefixed hex, zero-padded to `BYTES` bytes
    /// on output. Input accepts any width the type can hold.
    pub struct HexNum<const BYTES: usize, T>(PhantomData<T>);

    pub trait UintHex: Sized {
        fn from_hex(digits: &str) -> Option<Self>;
        fn to_hex(&self, width: usize) -> String;
    }

    impl UintHex for u64 {
        fn from_hex(digits: &str) -> Option<Self> {
            Self::from_str_radix(digits, 16).ok()
        }
        fn to_hex(&self, width: usize) -> String {
            format!("{self:0width$x}")
        }
    }
    impl UintHex for U256 {
        fn from_hex(digits: &str) -> Option<Self> {
            Self::from_str_radix(digits, 16).ok()
        }
        fn to_hex(&self, width: usize) -> String {
            format!("{self:0width$x}")
        }
    }

    impl<const BYTES: usize, T: UintHex> SerializeAs<T> for HexNum<BYTES, T> {
        fn serialize_as<S: Serializer>(value: &T, serializer: S) -> Result<S::Ok, S::Error> {
            serializer.serialize_str(&format!("0x{}", value.to_hex(2 * BYTES)))
        }
    }
    impl<'de, const BYTES: usize, T: UintHex> DeserializeAs<'de, T> for HexNum<BYTES, T> {
        fn deserialize_as<D: Deserializer<'de>>(deserializer: D) -> Result<T, D::Error> {
            let raw = String::deserialize(deserializer)?;
            T::from_hex(strip_0x(&raw))
                .ok_or_else(|| D::Error::custom(format!("not a hex number: {raw}")))
        }
    }
}
