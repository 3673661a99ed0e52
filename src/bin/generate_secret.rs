//! Print a random 512-bit signing secret suitable for `JWT_SECRET`.

use rand::{rngs::OsRng, RngCore};

const SECRET_BYTES: usize = 64;

fn generate_secret() -> String {
    let mut bytes = [0u8; SECRET_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

fn main() {
    println!("{}", generate_secret());
}
