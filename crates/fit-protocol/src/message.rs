use fit_types::ObjectId;

/// Protocol version sent in every handshake.
pub const PROTOCOL_VERSION: u8 = 1;

/// Longest branch name accepted on the wire, in bytes.
pub const MAX_BRANCH_LEN: usize = 255;

/// Port the daemon listens on unless configured otherwise.
pub const DEFAULT_PORT: u16 = 9418;

/// Largest pack either side accepts unless configured otherwise.
pub const DEFAULT_MAX_PACK_SIZE: u64 = 100 * 1024 * 1024;

/// Longest status message in a push reply, in bytes.
pub const MAX_STATUS_MESSAGE_LEN: usize = 4096;

/// Command byte of the handshake.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum Command {
    /// Legacy push: a bare pack whose first record becomes `main`.
    SendObjects = 1,
    /// Pull: ask for the object closure of a branch.
    RequestObjects = 2,
    /// Push with an explicit branch and tip.
    PushBranch = 3,
}

impl Command {
    pub fn tag(self) -> u8 {
        self as u8
    }

    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            1 => Some(Self::SendObjects),
            2 => Some(Self::RequestObjects),
            3 => Some(Self::PushBranch),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::SendObjects => "SEND_OBJECTS",
            Self::RequestObjects => "REQUEST_OBJECTS",
            Self::PushBranch => "PUSH_BRANCH",
        }
    }
}

/// A decoded request: handshake plus arguments. Any pack payload follows on
/// the same stream and is not part of this value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Request {
    SendObjects,
    RequestObjects { branch: String },
    PushBranch { branch: String, tip: ObjectId },
}

impl Request {
    pub fn command(&self) -> Command {
        match self {
            Self::SendObjects => Command::SendObjects,
            Self::RequestObjects { .. } => Command::RequestObjects,
            Self::PushBranch { .. } => Command::PushBranch,
        }
    }

    /// Branch named by the request, if any.
    pub fn branch(&self) -> Option<&str> {
        match self {
            Self::SendObjects => None,
            Self::RequestObjects { branch } | Self::PushBranch { branch, .. } => Some(branch),
        }
    }
}

/// The daemon's answer to `PUSH_BRANCH`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PushStatus {
    /// Objects stored and the branch moved.
    Accepted,
    /// Nothing moved; the message says why.
    Rejected(String),
}

impl PushStatus {
    pub const ACCEPTED_TAG: u8 = 0;
    pub const REJECTED_TAG: u8 = 1;

    pub fn tag(&self) -> u8 {
        match self {
            Self::Accepted => Self::ACCEPTED_TAG,
            Self::Rejected(_) => Self::REJECTED_TAG,
        }
    }

    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_tags() {
        for cmd in [Command::SendObjects, Command::RequestObjects, Command::PushBranch] {
            assert_eq!(Command::from_tag(cmd.tag()), Some(cmd));
        }
        assert_eq!(Command::SendObjects.tag(), 1);
        assert_eq!(Command::RequestObjects.tag(), 2);
        assert_eq!(Command::PushBranch.tag(), 3);
        assert_eq!(Command::from_tag(0), None);
        assert_eq!(Command::from_tag(4), None);
    }

    #[test]
    fn request_accessors() {
        let req = Request::PushBranch {
            branch: "main".into(),
            tip: ObjectId::null(),
        };
        assert_eq!(req.command(), Command::PushBranch);
        assert_eq!(req.branch(), Some("main"));
        assert_eq!(Request::SendObjects.branch(), None);
    }
}
