use {
    rand::{CryptoRng, Rng},
    solana_sdk::{
        hash::{self, Hash},
        pubkey::Pubkey,
        sanitize::{Sanitize, SanitizeError},
        signature::{Keypair, Signature, Signer},
    },
};

const PING_PONG_HASH_PREFIX: &[u8] = "SOLANA_PING_PONG".as_bytes();

/// Number of bytes in the randomly generated token sent with ping messages.
pub const GOSSIP_PING_TOKEN_SIZE: usize = 32;

pub type Token = [u8; GOSSIP_PING_TOKEN_SIZE];

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Ping {
    from: Pubkey,
    token: Token,
    signature: Signature,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Pong {
    from: Pubkey,
    hash: Hash, // Hash of received ping token.
    signature: Signature,
}

impl Ping {
    pub fn new(token: Token, keypair: &Keypair) -> Self {
        Ping {
            from: keypair.pubkey(),
            token,
            signature: keypair.sign_message(&token),
        }
    }

    pub fn new_rand<R>(rng: &mut R, keypair: &Keypair) -> Self
    where
        R: Rng + CryptoRng,
    {
        Self::new(rng.gen::<Token>(), keypair)
    }

    pub fn from(&self) -> &Pubkey {
        &self.from
    }

    pub(crate) fn token(&self) -> &Token {
        &self.token
    }

    pub fn verify(&self) -> bool {
        self.signature.verify(self.from.as_ref(), &self.token)
    }
}

impl Sanitize for Ping {
    fn sanitize(&self) -> Result<(), SanitizeError> {
        self.from.sanitize()?;
        self.signature.sanitize()
    }
}

impl Pong {
    pub fn new(ping: &Ping, keypair: &Keypair) -> Self {
        let hash = hash::hashv(&[PING_PONG_HASH_PREFIX, ping.token()]);
        Pong {
            from: keypair.pubkey(),
            hash,
            signature: keypair.sign_message(hash.as_ref()),
        }
    }

    pub fn from(&self) -> &Pubkey {
        &self.from
    }

    pub fn verify(&self) -> bool {
        self.signature.verify(self.from.as_ref(), self.hash.as_ref())
    }
}

impl Sanitize for Pong {
    fn sanitize(&self) -> Result<(), SanitizeError> {
        self.from.sanitize()?;
        self.hash.sanitize()?;
        self.signature.sanitize()
    }
}
