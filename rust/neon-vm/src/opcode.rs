use serde::{Deserialize, Serialize};

/// Instruction tags. Operands follow the opcode byte as big-endian integers;
/// see [`OpCode::operand_len`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum OpCode {
    Enter = 0,    // nest: u32, locals: u32
    Leave = 1,    // pop frame
    PushB = 2,    // boolean immediate (u8)
    PushN = 3,    // number literal from string table
    PushS = 4,    // string from string table
    PushPG = 5,   // pointer to global
    PushPPG = 6,  // pointer to predefined global, by name
    PushPMG = 7,  // pointer to module global
    PushPL = 8,   // pointer to local
    PushPOL = 9,  // pointer to outer local: back: u32, slot: u32
    PushI = 10,   // 32-bit integer immediate
    LoadB = 11,
    LoadN = 12,
    LoadS = 13,
    LoadA = 14,
    LoadD = 15,
    LoadP = 16,
    StoreB = 17,
    StoreN = 18,
    StoreS = 19,
    StoreA = 20,
    StoreD = 21,
    StoreP = 22,
    NegN = 23,
    AddN = 24,
    SubN = 25,
    MulN = 26,
    DivN = 27,
    ModN = 28,
    ExpN = 29,
    EqB = 30,
    NeB = 31,
    EqN = 32,
    NeN = 33,
    LtN = 34,
    GtN = 35,
    LeN = 36,
    GeN = 37,
    EqS = 38,
    NeS = 39,
    LtS = 40,
    GtS = 41,
    LeS = 42,
    GeS = 43,
    EqA = 44,
    NeA = 45,
    EqD = 46,
    NeD = 47,
    EqP = 48,
    NeP = 49,
    AndB = 50,
    OrB = 51,
    NotB = 52,
    IndexAR = 53, // array element address, read
    IndexAW = 54, // array element address, write (extends)
    IndexAV = 55, // array element value
    IndexAN = 56, // array element value, NIL when out of range
    IndexDR = 57, // dictionary entry address, read
    IndexDW = 58, // dictionary entry address, write (inserts)
    IndexDV = 59, // dictionary entry value
    InA = 60,
    InD = 61,
    CallP = 62,   // predefined (native) function, name from string table
    CallF = 63,   // function at code offset
    CallMF = 64,  // module function
    CallI = 65,   // indirect
    Jump = 66,
    Jf = 67,
    Jt = 68,
    JFChain = 69, // jump if false, dropping the next value
    Dup = 70,
    DupX1 = 71,
    Drop = 72,
    Ret = 73,
    CallE = 74,   // external library
    ConsA = 75,
    ConsD = 76,
    Except = 77,
    Alloc = 78,
    PushNil = 79,
    JNAssert = 80, // jump when assertions are disabled
    ResetC = 81,
    PushPEG = 82, // pointer to external global
    JumpTbl = 83,
    CallX = 84,   // extension
    Swap = 85,
    DropN = 86,
    PushM = 87,   // current module
    CallV = 88,   // virtual, through an interface
    PushCI = 89,  // class info
}

impl OpCode {
    pub const ALL: [OpCode; 90] = {
        use OpCode::*;
        [
            Enter, Leave, PushB, PushN, PushS, PushPG, PushPPG, PushPMG, PushPL, PushPOL, PushI,
            LoadB, LoadN, LoadS, LoadA, LoadD, LoadP, StoreB, StoreN, StoreS, StoreA, StoreD,
            StoreP, NegN, AddN, SubN, MulN, DivN, ModN, ExpN, EqB, NeB, EqN, NeN, LtN, GtN, LeN,
            GeN, EqS, NeS, LtS, GtS, LeS, GeS, EqA, NeA, EqD, NeD, EqP, NeP, AndB, OrB, NotB,
            IndexAR, IndexAW, IndexAV, IndexAN, IndexDR, IndexDW, IndexDV, InA, InD, CallP, CallF,
            CallMF, CallI, Jump, Jf, Jt, JFChain, Dup, DupX1, Drop, Ret, CallE, ConsA, ConsD,
            Except, Alloc, PushNil, JNAssert, ResetC, PushPEG, JumpTbl, CallX, Swap, DropN, PushM,
            CallV, PushCI,
        ]
    };

    /// Bytes of immediate operand following the opcode byte.
    pub fn operand_len(self) -> usize {
        use OpCode::*;
        match self {
            PushB => 1,
            Enter | PushPOL => 8,
            PushN | PushS | PushPG | PushPPG | PushPL | PushI | CallP | CallF | Jump | Jf | Jt
            | JFChain | ConsA | ConsD | Except | Alloc | JNAssert | JumpTbl | DropN => 4,
            _ => 0,
        }
    }

    /// Opcodes that need multi-module linking, extensions or class
    /// metadata, none of which a single decoded module provides.
    pub fn is_unsupported(self) -> bool {
        use OpCode::*;
        matches!(
            self,
            PushPMG | CallMF | CallE | PushPEG | CallX | PushM | CallV | PushCI
        )
    }

    pub fn mnemonic(self) -> &'static str {
        use OpCode::*;
        match self {
            Enter => "ENTER",
            Leave => "LEAVE",
            PushB => "PUSHB",
            PushN => "PUSHN",
            PushS => "PUSHS",
            PushPG => "PUSHPG",
            PushPPG => "PUSHPPG",
            PushPMG => "PUSHPMG",
            PushPL => "PUSHPL",
            PushPOL => "PUSHPOL",
            PushI => "PUSHI",
            LoadB => "LOADB",
            LoadN => "LOADN",
            LoadS => "LOADS",
            LoadA => "LOADA",
            LoadD => "LOADD",
            LoadP => "LOADP",
            StoreB => "STOREB",
            StoreN => "STOREN",
            StoreS => "STORES",
            StoreA => "STOREA",
            StoreD => "STORED",
            StoreP => "STOREP",
            NegN => "NEGN",
            AddN => "ADDN",
            SubN => "SUBN",
            MulN => "MULN",
            DivN => "DIVN",
            ModN => "MODN",
            ExpN => "EXPN",
            EqB => "EQB",
            NeB => "NEB",
            EqN => "EQN",
            NeN => "NEN",
            LtN => "LTN",
            GtN => "GTN",
            LeN => "LEN",
            GeN => "GEN",
            EqS => "EQS",
            NeS => "NES",
            LtS => "LTS",
            GtS => "GTS",
            LeS => "LES",
            GeS => "GES",
            EqA => "EQA",
            NeA => "NEA",
            EqD => "EQD",
            NeD => "NED",
            EqP => "EQP",
            NeP => "NEP",
            AndB => "ANDB",
            OrB => "ORB",
            NotB => "NOTB",
            IndexAR => "INDEXAR",
            IndexAW => "INDEXAW",
            IndexAV => "INDEXAV",
            IndexAN => "INDEXAN",
            IndexDR => "INDEXDR",
            IndexDW => "INDEXDW",
            IndexDV => "INDEXDV",
            InA => "INA",
            InD => "IND",
            CallP => "CALLP",
            CallF => "CALLF",
            CallMF => "CALLMF",
            CallI => "CALLI",
            Jump => "JUMP",
            Jf => "JF",
            Jt => "JT",
            JFChain => "JFCHAIN",
            Dup => "DUP",
            DupX1 => "DUPX1",
            Drop => "DROP",
            Ret => "RET",
            CallE => "CALLE",
            ConsA => "CONSA",
            ConsD => "CONSD",
            Except => "EXCEPT",
            Alloc => "ALLOC",
            PushNil => "PUSHNIL",
            JNAssert => "JNASSERT",
            ResetC => "RESETC",
            PushPEG => "PUSHPEG",
            JumpTbl => "JUMPTBL",
            CallX => "CALLX",
            Swap => "SWAP",
            DropN => "DROPN",
            PushM => "PUSHM",
            CallV => "CALLV",
            PushCI => "PUSHCI",
        }
    }
}

impl TryFrom<u8> for OpCode {
    type Error = u8;

    fn try_from(byte: u8) -> Result<Self, u8> {
        OpCode::ALL.get(usize::from(byte)).copied().ok_or(byte)
    }
}

impl std::fmt::Display for OpCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.mnemonic())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_matches_discriminants() {
        for (i, op) in OpCode::ALL.iter().enumerate() {
            assert_eq!(*op as u8 as usize, i, "{} out of place", op);
            assert_eq!(OpCode::try_from(i as u8), Ok(*op));
        }
    }

    #[test]
    fn unknown_bytes_are_rejected() {
        assert_eq!(OpCode::try_from(90), Err(90));
        assert_eq!(OpCode::try_from(255), Err(255));
    }

    #[test]
    fn operand_widths() {
        assert_eq!(OpCode::PushB.operand_len(), 1);
        assert_eq!(OpCode::Enter.operand_len(), 8);
        assert_eq!(OpCode::CallP.operand_len(), 4);
        assert_eq!(OpCode::Ret.operand_len(), 0);
    }
}
