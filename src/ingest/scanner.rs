//! # RecordScanner — Extração de Objetos JSON de um Stream Aberto
//!
//! O gerador emite texto aos pedaços; um objeto JSON pode chegar partido em
//! qualquer byte. O scanner acumula os chunks e encontra **spans balanceados**
//! `{ ... }` sem esperar o stream terminar.
//!
//! ## Algoritmo
//!
//! ```text
//! chunk ──▶ buffer ──▶ varredura byte a byte (retoma de onde parou)
//!                        │
//!                        ├─ '"' fora de string ─▶ entra em string
//!                        ├─ '\' em string ──────▶ escapa o próximo byte
//!                        ├─ '{' fora de string ─▶ profundidade += 1 (abre span em 0)
//!                        └─ '}' fora de string ─▶ profundidade -= 1 (fecha span em 0)
//!                                                       │
//!                                                       ▼
//!                                          NodeRecord::parse(span)
//! ```
//!
//! O estado (profundidade, string, escape) sobrevive entre chunks, então
//! nenhum byte é varrido duas vezes e cada span é emitido **exatamente uma
//! vez**, independente de como o texto foi fatiado. Um span malformado é
//! reportado e o scanner segue em frente: nunca trava.
//!
//! Só bytes ASCII (`{`, `}`, `"`, `\`) mudam o estado, e eles nunca aparecem
//! dentro de uma sequência UTF-8 multibyte: cortar um caractere entre dois
//! chunks é inofensivo.

use super::record::{NodeRecord, RecordRejection};

/// Tamanho máximo padrão de um span (bytes).
pub const DEFAULT_MAX_SPAN: usize = 64 * 1024;

/// Um span candidato e o resultado do seu parse.
#[derive(Clone, Debug, PartialEq)]
pub struct ScannedRecord {
    /// Posição do span na sequência de candidatos (0, 1, 2...).
    pub index: usize,
    pub outcome: Result<NodeRecord, RecordRejection>,
}

/// Scanner retomável de spans `{ ... }`.
#[derive(Clone, Debug)]
pub struct RecordScanner {
    buffer: Vec<u8>,
    cursor: usize,
    span_start: Option<usize>,
    depth: usize,
    in_string: bool,
    escaped: bool,
    emitted: usize,
    max_span: usize,
}

impl Default for RecordScanner {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_SPAN)
    }
}

impl RecordScanner {
    /// Cria um scanner que abandona spans maiores que `max_span` bytes.
    pub fn new(max_span: usize) -> Self {
        Self {
            buffer: Vec::new(),
            cursor: 0,
            span_start: None,
            depth: 0,
            in_string: false,
            escaped: false,
            emitted: 0,
            max_span: max_span.max(2),
        }
    }

    /// Quantos candidatos já foram emitidos.
    pub fn emitted(&self) -> usize {
        self.emitted
    }

    /// Bytes retidos à espera do fim de um span aberto.
    pub fn pending_bytes(&self) -> usize {
        self.buffer.len()
    }

    /// Acrescenta um chunk e retorna os spans que ele completou.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<ScannedRecord> {
        self.buffer.extend_from_slice(chunk);
        let mut scanned = Vec::new();

        while self.cursor < self.buffer.len() {
            let at = self.cursor;
            let byte = self.buffer[at];
            self.cursor += 1;

            if self.in_string {
                if self.escaped {
                    self.escaped = false;
                } else if byte == b'\\' {
                    self.escaped = true;
                } else if byte == b'"' {
                    self.in_string = false;
                }
            } else {
                match byte {
                    b'"' => self.in_string = true,
                    b'{' => {
                        if self.depth == 0 {
                            self.span_start = Some(at);
                        }
                        self.depth += 1;
                    }
                    b'}' if self.depth > 0 => {
                        self.depth -= 1;
                        if self.depth == 0 {
                            if let Some(start) = self.span_start.take() {
                                scanned.push(self.emit(start, at + 1));
                            }
                        }
                    }
                    _ => {}
                }
            }

            if let Some(start) = self.span_start {
                if self.cursor - start > self.max_span {
                    scanned.push(self.abandon(start));
                }
            }
        }

        self.compact();
        scanned
    }

    /// Fecha o stream: um span ainda aberto é reportado como truncado.
    pub fn finish(&mut self) -> Option<ScannedRecord> {
        self.span_start.take()?;
        self.depth = 0;
        self.in_string = false;
        self.escaped = false;
        self.buffer.clear();
        self.cursor = 0;
        let index = self.next_index();
        tracing::debug!(index, "Span truncado no fim do stream");
        Some(ScannedRecord {
            index,
            outcome: Err(RecordRejection::Truncated),
        })
    }

    fn next_index(&mut self) -> usize {
        let index = self.emitted;
        self.emitted += 1;
        index
    }

    fn emit(&mut self, start: usize, end: usize) -> ScannedRecord {
        let outcome = NodeRecord::parse(&self.buffer[start..end]);
        let index = self.next_index();
        if let Err(reason) = &outcome {
            tracing::debug!(index, %reason, "Span malformado ignorado");
        }
        ScannedRecord { index, outcome }
    }

    /// Desiste de um span grande demais e volta a varrer logo após o `{`.
    fn abandon(&mut self, start: usize) -> ScannedRecord {
        self.span_start = None;
        self.depth = 0;
        self.in_string = false;
        self.escaped = false;
        self.cursor = start + 1;
        let index = self.next_index();
        tracing::debug!(index, max = self.max_span, "Span grande demais abandonado");
        ScannedRecord {
            index,
            outcome: Err(RecordRejection::Oversized(self.max_span)),
        }
    }

    /// Descarta os bytes já consumidos que não pertencem a um span aberto.
    fn compact(&mut self) {
        let keep_from = self.span_start.unwrap_or(self.cursor);
        if keep_from == 0 {
            return;
        }
        self.buffer.drain(..keep_from);
        self.cursor -= keep_from;
        if let Some(start) = self.span_start.as_mut() {
            *start -= keep_from;
        }
    }
}
