//! Fixed 1.44 MB floppy boot image used when no boot image is supplied.
//!
//! The first sector holds a real-mode routine that prints a message through the
//! BIOS teletype service, waits for a key and halts.
//!
//! ```text
//! [0x000..] code
//! [0x080..] NUL-terminated message
//! [0x1FE]   0x55 0xAA boot signature
//! ```

use resiliso::prelude::FLOPPY_1_44M;

pub const MESSAGE_OFFSET: usize = 0x80;
pub const MESSAGE: &[u8] = b"RESILISO BOOT OK\r\nPRESS ANY KEY\r\n\0";

#[rustfmt::skip]
const CODE: [u8; 25] = [
    0x31, 0xC0,             // xor ax, ax
    0x8E, 0xD8,             // mov ds, ax
    0xBE, 0x80, 0x7C,       // mov si, 0x7C80
    0xB4, 0x0E,             // mov ah, 0x0E
    0xAC,                   // print: lodsb
    0x3C, 0x00,             // cmp al, 0
    0x74, 0x04,             // jz wait
    0xCD, 0x10,             // int 0x10
    0xEB, 0xF7,             // jmp print
    0xB4, 0x00,             // wait: mov ah, 0
    0xCD, 0x16,             // int 0x16
    0xF4,                   // hlt
    0xEB, 0xFE,             // jmp $
];

pub fn boot_image() -> Vec<u8> {
    let mut image = vec![0u8; FLOPPY_1_44M];
    image[..CODE.len()].copy_from_slice(&CODE);
    image[MESSAGE_OFFSET..MESSAGE_OFFSET + MESSAGE.len()].copy_from_slice(MESSAGE);
    image[510] = 0x55;
    image[511] = 0xAA;
    image
}
