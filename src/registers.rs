// src/registers.rs - Vim-style yank/paste register system

use crate::clipboard::SystemClipboard;
use crate::error::EditorError;
use std::cell::RefCell;
use std::collections::HashMap;

const NUMBERED_REGISTERS: usize = 10;

/// Register holding the most recent unnamed write
pub const UNNAMED: char = '"';

/// How register content is put back into a buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterKind {
    /// Inserted inline at the cursor
    Char,
    /// Whole lines, each terminated by `\n`
    Line,
    /// Rectangular pieces joined by `\n`, one per line
    Block,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Register {
    pub text: String,
    pub kind: RegisterKind,
}

impl Register {
    pub fn new(text: impl Into<String>, kind: RegisterKind) -> Self {
        Self {
            text: text.into(),
            kind,
        }
    }

    pub fn chars(text: impl Into<String>) -> Self {
        Self::new(text, RegisterKind::Char)
    }

    pub fn lines(text: impl Into<String>) -> Self {
        Self::new(text, RegisterKind::Line)
    }

    pub fn block(text: impl Into<String>) -> Self {
        Self::new(text, RegisterKind::Block)
    }

    /// Block pieces, one per line
    pub fn pieces(&self) -> Vec<&str> {
        self.text.split('\n').collect()
    }

    fn append(&mut self, other: Register) {
        if self.kind == RegisterKind::Line && other.kind == RegisterKind::Line {
            self.text.push_str(&other.text);
        } else if self.kind == other.kind {
            if self.kind == RegisterKind::Block {
                self.text.push('\n');
            }
            self.text.push_str(&other.text);
        } else {
            // Mixed append turns the register line-wise, like Vim
            let mut text = std::mem::take(&mut self.text);
            if !text.ends_with('\n') {
                text.push('\n');
            }
            text.push_str(&other.text);
            if !text.ends_with('\n') {
                text.push('\n');
            }
            self.text = text;
            self.kind = RegisterKind::Line;
        }
    }
}

/// Vim-style register system for yank/paste operations
#[derive(Debug, Default)]
pub struct Registers {
    /// Unnamed register (")
    pub unnamed: Option<Register>,
    /// Numbered registers 0-9
    /// 0 = last yank, 1-9 = deletes (1 = most recent)
    pub numbered: [Option<Register>; NUMBERED_REGISTERS],
    /// Named registers a-z
    pub named: HashMap<char, Register>,
    /// Small delete register (for deletes within one line)
    pub small_delete: Option<Register>,
    /// Fallback for + and * when no system clipboard is reachable
    pub clipboard: Option<Register>,
    /// Last inserted text (.)
    last_inserted: Option<String>,
    /// Last executed command line (:)
    last_command: Option<String>,
    /// Last search pattern (/)
    last_search: Option<String>,
    /// Active file name (%)
    file_name: Option<String>,
    system: RefCell<SystemClipboard>,
}

impl Registers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `content` in register `reg`; the unnamed register follows.
    /// reg = '"' for unnamed, '0'-'9' for numbered, 'a'-'z' for named,
    /// 'A'-'Z' to append, '*' and '+' for clipboard, '-' for small delete.
    pub fn write(&mut self, reg: char, content: Register) -> Result<(), EditorError> {
        match reg {
            '"' => {}
            '0'..='9' => {
                let idx = reg as usize - '0' as usize;
                self.numbered[idx] = Some(content.clone());
            }
            '-' => self.small_delete = Some(content.clone()),
            '*' | '+' => {
                self.system.borrow_mut().set_text(&content.text);
                self.clipboard = Some(content.clone());
            }
            'a'..='z' => {
                self.named.insert(reg, content.clone());
            }
            'A'..='Z' => {
                let key = reg.to_ascii_lowercase();
                match self.named.get_mut(&key) {
                    Some(existing) => {
                        existing.append(content);
                        self.unnamed = Some(existing.clone());
                        return Ok(());
                    }
                    None => {
                        self.named.insert(key, content.clone());
                    }
                }
            }
            _ => return check_writable(Some(reg)),
        }
        self.unnamed = Some(content);
        Ok(())
    }

    /// Read a register. Unset registers yield `EmptyRegister`.
    pub fn read(&self, reg: char) -> Result<Register, EditorError> {
        let found = match reg {
            '"' => self.unnamed.clone(),
            '0'..='9' => {
                let idx = reg as usize - '0' as usize;
                self.numbered[idx].clone()
            }
            '-' => self.small_delete.clone(),
            '*' | '+' => self.read_clipboard(),
            'a'..='z' | 'A'..='Z' => self.named.get(&reg.to_ascii_lowercase()).cloned(),
            '.' => self.last_inserted.clone().map(Register::chars),
            ':' => self.last_command.clone().map(Register::chars),
            '/' => self.last_search.clone().map(Register::chars),
            '%' => self.file_name.clone().map(Register::chars),
            _ => None,
        };
        found
            .filter(|r| !r.text.is_empty())
            .ok_or(EditorError::EmptyRegister(reg))
    }

    fn read_clipboard(&self) -> Option<Register> {
        match self.system.borrow_mut().get_text() {
            Some(text) => {
                // keep the kind we wrote if the clipboard still holds our text
                match &self.clipboard {
                    Some(local) if local.text == text => Some(local.clone()),
                    _ if text.ends_with('\n') => Some(Register::lines(text)),
                    _ => Some(Register::chars(text)),
                }
            }
            None => self.clipboard.clone(),
        }
    }

    /// Record a yank: goes to the target (if any), register 0 and unnamed.
    pub fn record_yank(&mut self, target: Option<char>, content: Register) -> Result<(), EditorError> {
        check_writable(target)?;
        self.numbered[0] = Some(content.clone());
        self.store_target(target, content)
    }

    /// Record a delete or change.
    /// Deletes within one line go to `-`; larger ones shift 1->2, 2->3, etc.
    pub fn record_delete(&mut self, target: Option<char>, content: Register) -> Result<(), EditorError> {
        check_writable(target)?;
        let is_small = content.kind == RegisterKind::Char && !content.text.contains('\n');
        if is_small {
            self.small_delete = Some(content.clone());
        } else {
            for i in (2..NUMBERED_REGISTERS).rev() {
                self.numbered[i] = self.numbered[i - 1].take();
            }
            self.numbered[1] = Some(content.clone());
        }
        self.store_target(target, content)
    }

    fn store_target(&mut self, target: Option<char>, content: Register) -> Result<(), EditorError> {
        match target {
            Some(reg) if reg != UNNAMED => self.write(reg, content),
            _ => {
                self.unnamed = Some(content);
                Ok(())
            }
        }
    }

    /// Store last inserted text (for the . register)
    pub fn store_inserted(&mut self, text: String) {
        self.last_inserted = Some(text);
    }

    pub fn store_command(&mut self, text: String) {
        self.last_command = Some(text);
    }

    pub fn store_search(&mut self, pattern: String) {
        self.last_search = Some(pattern);
    }

    pub fn set_file_name(&mut self, name: Option<String>) {
        self.file_name = name;
    }

    /// Clear all registers
    pub fn clear(&mut self) {
        self.unnamed = None;
        self.numbered = Default::default();
        self.named.clear();
        self.small_delete = None;
        self.clipboard = None;
        self.last_inserted = None;
        self.last_command = None;
        self.last_search = None;
    }

    /// Check if register exists and has content
    pub fn has_content(&self, reg: char) -> bool {
        self.read(reg).is_ok()
    }
}

/// Fails for read-only and unknown register names; `None` is the unnamed register.
fn check_writable(target: Option<char>) -> Result<(), EditorError> {
    match target {
        None => Ok(()),
        Some(reg @ ('.' | '%' | ':' | '/')) => Err(EditorError::ReadOnlyRegister(reg)),
        Some(reg) if reg.is_ascii_alphanumeric() || matches!(reg, '"' | '-' | '*' | '+') => Ok(()),
        Some(reg) => Err(EditorError::InvalidCommand(format!("register {}", reg))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unnamed_register() {
        let mut regs = Registers::new();
        regs.write('"', Register::chars("hello")).unwrap();
        assert_eq!(regs.read('"').unwrap().text, "hello");
    }

    #[test]
    fn test_empty_register_is_explicit() {
        let regs = Registers::new();
        assert!(matches!(regs.read('"'), Err(EditorError::EmptyRegister('"'))));
        assert!(matches!(regs.read('q'), Err(EditorError::EmptyRegister('q'))));
    }

    #[test]
    fn test_named_write_also_sets_unnamed() {
        let mut regs = Registers::new();
        regs.record_yank(Some('a'), Register::chars("text_a")).unwrap();
        assert_eq!(regs.read('a').unwrap().text, "text_a");
        assert_eq!(regs.read('"').unwrap().text, "text_a");
        assert_eq!(regs.read('0').unwrap().text, "text_a");
    }

    #[test]
    fn test_append_to_named_register() {
        let mut regs = Registers::new();
        regs.write('a', Register::chars("hello")).unwrap();
        regs.write('A', Register::chars(" world")).unwrap();
        assert_eq!(regs.read('a').unwrap().text, "hello world");
        assert_eq!(regs.read('"').unwrap().text, "hello world");
    }

    #[test]
    fn test_mixed_append_becomes_linewise() {
        let mut regs = Registers::new();
        regs.write('a', Register::lines("one\n")).unwrap();
        regs.write('A', Register::chars("two")).unwrap();
        let reg = regs.read('a').unwrap();
        assert_eq!(reg.text, "one\ntwo\n");
        assert_eq!(reg.kind, RegisterKind::Line);
    }

    #[test]
    fn test_delete_shifts_numbered_registers() {
        let mut regs = Registers::new();
        regs.record_delete(None, Register::lines("first\n")).unwrap();
        regs.record_delete(None, Register::lines("second\n")).unwrap();
        regs.record_delete(None, Register::lines("third\n")).unwrap();

        assert_eq!(regs.read('1').unwrap().text, "third\n");
        assert_eq!(regs.read('2').unwrap().text, "second\n");
        assert_eq!(regs.read('3').unwrap().text, "first\n");
        assert_eq!(regs.read('"').unwrap().text, "third\n");
    }

    #[test]
    fn test_small_delete_register() {
        let mut regs = Registers::new();
        regs.record_delete(None, Register::chars("x")).unwrap();
        assert_eq!(regs.read('-').unwrap().text, "x");
        assert!(regs.read('1').is_err());
    }

    #[test]
    fn test_read_only_registers() {
        let mut regs = Registers::new();
        assert!(matches!(
            regs.write('.', Register::chars("x")),
            Err(EditorError::ReadOnlyRegister('.'))
        ));
        regs.store_inserted("typed".to_string());
        regs.store_search("pat".to_string());
        regs.store_command("w".to_string());
        regs.set_file_name(Some("notes.txt".to_string()));
        assert_eq!(regs.read('.').unwrap().text, "typed");
        assert_eq!(regs.read('/').unwrap().text, "pat");
        assert_eq!(regs.read(':').unwrap().text, "w");
        assert_eq!(regs.read('%').unwrap().text, "notes.txt");
    }

    #[test]
    fn test_clear() {
        let mut regs = Registers::new();
        regs.write('"', Register::chars("hello")).unwrap();
        regs.write('a', Register::chars("world")).unwrap();

        regs.clear();

        assert!(!regs.has_content('"'));
        assert!(!regs.has_content('a'));
    }

    #[test]
    fn test_failed_record_leaves_registers_alone() {
        let mut regs = Registers::new();
        regs.record_yank(None, Register::lines("kept\n")).unwrap();
        regs.record_delete(None, Register::lines("gone\n")).unwrap();

        assert!(regs.record_delete(Some('%'), Register::lines("new\n")).is_err());
        assert!(regs.record_yank(Some('/'), Register::lines("new\n")).is_err());
        assert!(regs.record_delete(Some('!'), Register::chars("x")).is_err());

        assert_eq!(regs.read('0').unwrap().text, "kept\n");
        assert_eq!(regs.read('1').unwrap().text, "gone\n");
        assert!(regs.read('2').is_err());
        assert!(regs.read('-').is_err());
        assert_eq!(regs.read('"').unwrap().text, "gone\n");
    }
}
