//! IRC numeric reply codes.
//!
//! Three-digit codes sent with the server as prefix and the target's nick
//! as first parameter. Only the numerics the engine actually emits are
//! listed; the enum is non-exhaustive so additions stay painless.

#![allow(non_camel_case_types)]

/// An IRC numeric reply.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u16)]
#[non_exhaustive]
pub enum Response {
    // === Connection registration ===
    /// 001 - welcome to the network
    RPL_WELCOME = 1,

    // === Command replies ===
    /// 221 - own user modes
    RPL_UMODEIS = 221,
    /// 263 - command dropped due to server-side pacing
    RPL_LOAD2HI = 263,
    /// 276 - WHOIS certificate fingerprint
    RPL_WHOISCERTFP = 276,
    /// 301 - target is away
    RPL_AWAY = 301,
    /// 305 - no longer away
    RPL_UNAWAY = 305,
    /// 306 - now marked away
    RPL_NOWAWAY = 306,
    /// 307 - WHOIS: nick is registered
    RPL_WHOISREGNICK = 307,
    /// 311 - WHOIS: user line
    RPL_WHOISUSER = 311,
    /// 312 - WHOIS: server line
    RPL_WHOISSERVER = 312,
    /// 313 - WHOIS: operator line
    RPL_WHOISOPERATOR = 313,
    /// 317 - WHOIS: idle seconds and signon time
    RPL_WHOISIDLE = 317,
    /// 318 - end of WHOIS
    RPL_ENDOFWHOIS = 318,
    /// 319 - WHOIS: channel membership list
    RPL_WHOISCHANNELS = 319,
    /// 324 - channel mode query reply
    RPL_CHANNELMODEIS = 324,
    /// 329 - channel creation time
    RPL_CREATIONTIME = 329,
    /// 330 - WHOIS: logged in as
    RPL_WHOISACCOUNT = 330,
    /// 331 - no topic set
    RPL_NOTOPIC = 331,
    /// 332 - channel topic
    RPL_TOPIC = 332,
    /// 333 - topic setter and time
    RPL_TOPICWHOTIME = 333,
    /// 337 - WHOIS: free-form text line
    RPL_WHOISTEXT = 337,
    /// 338 - WHOIS: actual user@host and IP
    RPL_WHOISACTUALLY = 338,
    /// 341 - invite confirmation to the inviter
    RPL_INVITING = 341,
    /// 346 - invite-exception list entry
    RPL_INVEXLIST = 346,
    /// 347 - end of invite-exception list
    RPL_ENDOFINVEXLIST = 347,
    /// 348 - ban-exception list entry
    RPL_EXCEPTLIST = 348,
    /// 349 - end of ban-exception list
    RPL_ENDOFEXCEPTLIST = 349,
    /// 353 - NAMES reply
    RPL_NAMREPLY = 353,
    /// 366 - end of NAMES
    RPL_ENDOFNAMES = 366,
    /// 367 - ban list entry
    RPL_BANLIST = 367,
    /// 368 - end of ban list
    RPL_ENDOFBANLIST = 368,
    /// 379 - WHOIS: user modes (opers and self)
    RPL_WHOISMODES = 379,

    // === Error replies ===
    /// 401 - no such nick/channel
    ERR_NOSUCHNICK = 401,
    /// 402 - no such server
    ERR_NOSUCHSERVER = 402,
    /// 403 - no such channel
    ERR_NOSUCHCHANNEL = 403,
    /// 404 - cannot send to channel
    ERR_CANNOTSENDTOCHAN = 404,
    /// 405 - too many channels
    ERR_TOOMANYCHANNELS = 405,
    /// 408 - control codes not allowed on channel
    ERR_NOCTRLSONCHAN = 408,
    /// 412 - no text to send
    ERR_NOTEXTTOSEND = 412,
    /// 421 - unknown command
    ERR_UNKNOWNCOMMAND = 421,
    /// 431 - no nickname given
    ERR_NONICKNAMEGIVEN = 431,
    /// 432 - erroneous nickname
    ERR_ERRONEUSNICKNAME = 432,
    /// 433 - nickname in use
    ERR_NICKNAMEINUSE = 433,
    /// 436 - nickname collision (TS rules)
    ERR_NICKCOLLISION = 436,
    /// 441 - they aren't on that channel
    ERR_USERNOTINCHANNEL = 441,
    /// 442 - you're not on that channel
    ERR_NOTONCHANNEL = 442,
    /// 443 - already on channel
    ERR_USERONCHANNEL = 443,
    /// 451 - not registered
    ERR_NOTREGISTERED = 451,
    /// 461 - not enough parameters
    ERR_NEEDMOREPARAMS = 461,
    /// 462 - already registered
    ERR_ALREADYREGISTERED = 462,
    /// 471 - channel is full (+l)
    ERR_CHANNELISFULL = 471,
    /// 472 - unknown mode character
    ERR_UNKNOWNMODE = 472,
    /// 473 - invite-only channel (+i)
    ERR_INVITEONLYCHAN = 473,
    /// 474 - banned from channel (+b)
    ERR_BANNEDFROMCHAN = 474,
    /// 475 - bad channel key (+k)
    ERR_BADCHANNELKEY = 475,
    /// 477 - registered nick required (+r/+M)
    ERR_NEEDREGGEDNICK = 477,
    /// 479 - illegal channel name
    ERR_BADCHANNAME = 479,
    /// 481 - permission denied, no privileges
    ERR_NOPRIVILEGES = 481,
    /// 482 - channel operator privileges needed
    ERR_CHANOPRIVSNEEDED = 482,
    /// 489 - TLS-only channel (+S)
    ERR_SECUREONLYCHAN = 489,
    /// 492 - CTCP not allowed on channel (+C)
    ERR_NOCTCP = 492,
    /// 502 - cannot change modes for other users
    ERR_USERSDONTMATCH = 502,
    /// 512 - watch list is full
    ERR_TOOMANYWATCH = 512,
    /// 520 - oper-only channel (+O)
    ERR_OPERONLYCHAN = 520,

    // === Watch ===
    /// 600 - watched nick logged on
    RPL_LOGON = 600,
    /// 601 - watched nick logged off
    RPL_LOGOFF = 601,
    /// 602 - stopped watching
    RPL_WATCHOFF = 602,
    /// 603 - watch status summary
    RPL_WATCHSTAT = 603,
    /// 604 - watched nick is online now
    RPL_NOWON = 604,
    /// 605 - watched nick is offline now
    RPL_NOWOFF = 605,
    /// 606 - watch list entry
    RPL_WATCHLIST = 606,
    /// 607 - end of watch list
    RPL_ENDOFWATCHLIST = 607,

    // === Extended/modern ===
    /// 671 - connection is using TLS
    RPL_WHOISSECURE = 671,
    /// 716 - target has caller-id (+g/+G) set
    RPL_TARGUMODEG = 716,
}

impl Response {
    /// The numeric code.
    #[inline]
    pub fn code(self) -> u16 {
        self as u16
    }

    /// The code as the zero-padded three-digit command word.
    pub fn as_command(self) -> String {
        format!("{:03}", self.code())
    }

    /// Is this an error numeric (400-599)?
    pub fn is_error(self) -> bool {
        (400..600).contains(&self.code())
    }
}
