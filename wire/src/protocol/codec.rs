/// Header types that travel on the wire.
///
/// `deserialize` wants the whole header in `bytes`; connections feed the
/// incremental decoders instead, since a header may arrive split across any
/// number of reads.
pub trait Protocol: Sized {
    /// What the decoder must know beyond the bytes themselves.
    type Context;

    /// Serialize the header into its wire bytes. Bodies are streamed separately.
    fn serialize(&self) -> Vec<u8>;

    fn deserialize(bytes: &[u8], context: Self::Context) -> crate::Result<Self>;
}
