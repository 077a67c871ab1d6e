//! Telnet IAC negotiation filter and VT100 arrow-key translation, grounded
//! on `vtty_read_and_store`'s input state machine.

const IAC: u8 = 255;
const WILL: u8 = 251;
const WONT: u8 = 252;
const DO: u8 = 253;
const DONT: u8 = 254;
const SB: u8 = 250;
const SE: u8 = 240;

const OPT_ECHO: u8 = 1;
const OPT_SGA: u8 = 3;
const OPT_TTYPE: u8 = 24;
const OPT_LINEMODE: u8 = 34;

const ESC: u8 = 0x1b;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum State {
    Text,
    Vt1,
    Vt2,
    Telnet,
    TelnetIyou,
    TelnetSb1,
    TelnetSb2,
    TelnetSbTtype,
}

/// Byte-at-a-time filter sitting between a raw socket/tty stream and the
/// application ring buffer. Produces application bytes via `feed`'s return
/// value and negotiation replies via `pending_replies`.
pub struct TelnetFilter {
    state: State,
    replies: Vec<u8>,
}

impl Default for TelnetFilter {
    fn default() -> Self {
        TelnetFilter { state: State::Text, replies: Vec::new() }
    }
}

impl TelnetFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sends the initial negotiation: WILL ECHO, WILL SGA, DONT LINEMODE,
    /// DO TTYPE.
    pub fn initial_negotiation() -> Vec<u8> {
        vec![
            IAC, WILL, OPT_ECHO,
            IAC, WILL, OPT_SGA,
            IAC, DONT, OPT_LINEMODE,
            IAC, DO, OPT_TTYPE,
        ]
    }

    /// Drains bytes queued for transmission back to the peer (telnet
    /// replies, TTYPE subnegotiation responses).
    pub fn take_replies(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.replies)
    }

    /// Feeds one raw input byte through the state machine. Returns the 0-3
    /// application bytes this byte (or the sequence it completed) releases
    /// to the guest — an abandoned VT1/VT2 escape reinjects every byte it
    /// swallowed, so a single input byte can widen into more than one.
    pub fn feed(&mut self, byte: u8) -> Vec<u8> {
        match self.state {
            State::Text => {
                if byte == IAC {
                    self.state = State::Telnet;
                    vec![]
                } else if byte == ESC {
                    self.state = State::Vt1;
                    vec![]
                } else if byte == 0 || byte == 10 {
                    // NUL: generated by Linux telnet. LF: ignored on Windows.
                    vec![]
                } else {
                    vec![byte]
                }
            }
            State::Vt1 => {
                self.state = State::Text;
                if byte == b'[' {
                    self.state = State::Vt2;
                    vec![]
                } else {
                    vec![ESC, byte]
                }
            }
            State::Vt2 => {
                self.state = State::Text;
                match byte {
                    b'A' => vec![16], // up    -> Ctrl-P
                    b'B' => vec![14], // down  -> Ctrl-N
                    b'C' => vec![6],  // right -> Ctrl-F
                    b'D' => vec![2],  // left  -> Ctrl-B
                    _ => vec![b'[', ESC, byte],
                }
            }
            State::Telnet => {
                match byte {
                    WILL | WONT | DO | DONT => {
                        self.state = State::TelnetIyou;
                        vec![]
                    }
                    SB => {
                        self.state = State::TelnetSb1;
                        vec![]
                    }
                    IAC => {
                        self.state = State::Text;
                        vec![IAC]
                    }
                    _ => {
                        self.state = State::Text;
                        vec![]
                    }
                }
            }
            State::TelnetIyou => {
                self.state = State::Text;
                vec![]
            }
            State::TelnetSb1 => {
                if byte == OPT_TTYPE {
                    self.state = State::TelnetSbTtype;
                } else {
                    self.state = State::TelnetSb2;
                }
                vec![]
            }
            State::TelnetSb2 => {
                if byte == IAC {
                    self.state = State::Text;
                }
                vec![]
            }
            State::TelnetSbTtype => {
                if byte == IAC {
                    self.state = State::Text;
                } else if byte == 1 {
                    // SEND: reply IS "VT100"
                    self.replies.extend_from_slice(&[IAC, SB, OPT_TTYPE, 0]);
                    self.replies.extend_from_slice(b"VT100");
                    self.replies.extend_from_slice(&[IAC, SE]);
                }
                vec![]
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_passes_through() {
        let mut f = TelnetFilter::new();
        assert_eq!(f.feed(b'h'), vec![b'h']);
    }

    #[test]
    fn nul_and_lf_standalone_bytes_are_dropped() {
        let mut f = TelnetFilter::new();
        assert_eq!(f.feed(0), Vec::<u8>::new());
        assert_eq!(f.feed(10), Vec::<u8>::new());
        assert_eq!(f.feed(b'x'), vec![b'x']);
    }

    #[test]
    fn vt100_up_arrow_becomes_ctrl_p() {
        let mut f = TelnetFilter::new();
        assert_eq!(f.feed(ESC), Vec::<u8>::new());
        assert_eq!(f.feed(b'['), Vec::<u8>::new());
        assert_eq!(f.feed(b'A'), vec![16]);
    }

    #[test]
    fn abandoned_vt1_escape_reinjects_both_bytes() {
        let mut f = TelnetFilter::new();
        assert_eq!(f.feed(ESC), Vec::<u8>::new());
        assert_eq!(f.feed(b'x'), vec![ESC, b'x']);
    }

    #[test]
    fn abandoned_vt2_escape_reinjects_all_three_bytes() {
        let mut f = TelnetFilter::new();
        assert_eq!(f.feed(ESC), Vec::<u8>::new());
        assert_eq!(f.feed(b'['), Vec::<u8>::new());
        assert_eq!(f.feed(b'Z'), vec![b'[', ESC, b'Z']);
    }

    #[test]
    fn iac_escape_passes_through_literal_iac() {
        let mut f = TelnetFilter::new();
        assert_eq!(f.feed(IAC), Vec::<u8>::new());
        assert_eq!(f.feed(IAC), vec![IAC]);
    }

    #[test]
    fn telnet_do_option_is_absorbed_not_delivered() {
        let mut f = TelnetFilter::new();
        assert_eq!(f.feed(IAC), Vec::<u8>::new());
        assert_eq!(f.feed(DO), Vec::<u8>::new());
        assert_eq!(f.feed(OPT_ECHO), Vec::<u8>::new());
        assert_eq!(f.feed(b'x'), vec![b'x']);
    }

    #[test]
    fn ttype_send_triggers_vt100_reply() {
        let mut f = TelnetFilter::new();
        for b in [IAC, SB, OPT_TTYPE, 1u8, IAC, SE] {
            f.feed(b);
        }
        let replies = f.take_replies();
        assert!(replies.windows(5).any(|w| w == b"VT100"));
    }
}
