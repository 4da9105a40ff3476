use base64ct::{Base64UrlUnpadded, Encoding};
use rand::{rngs::OsRng, RngCore};

/// 256 bits of entropy per token.
const TOKEN_BYTES: usize = 32;

/// Generate an opaque, URL-safe token. Used for both session IDs and
/// password-reset tokens; collisions are treated as impossible given the
/// entropy budget.
pub fn generate_token() -> String {
    let mut buf = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut buf);
    Base64UrlUnpadded::encode_string(&buf)
}
