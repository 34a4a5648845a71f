use log::info;

use crate::error::Result;
use crate::huffman_coding::code_tree::CodeTree;
use crate::huffman_coding::freq_table::FrequencyTable;

/// One frequency table and the code tree built from it.
///
/// Both are fixed for the life of the coder. A coder holds no other state between calls, so it can be
/// reused for any number of encode/decode runs over data the table covers. It is not meant to be shared
/// across threads mid-run; build one per job.
#[derive(Debug, Clone)]
pub struct Coder {
    pub(crate) table: FrequencyTable,
    pub(crate) tree: CodeTree,
}

impl Coder {
    /// Build the code tree for table. Fails if the table has no valid entries.
    pub fn new(table: FrequencyTable) -> Result<Self> {
        let tree = CodeTree::build(&table)?;
        info!(
            "Coder ready: {} bit symbols, {} codes, longest code {} bits",
            table.symbol_width(),
            tree.leaf_count(),
            tree.depth()
        );
        Ok(Self { table, tree })
    }

    pub fn table(&self) -> &FrequencyTable {
        &self.table
    }

    pub fn tree(&self) -> &CodeTree {
        &self.tree
    }

    pub fn symbol_width(&self) -> u32 {
        self.table.symbol_width()
    }

    /// True if other would build exactly our tree (same width, same counts).
    pub(crate) fn same_code(&self, other: &FrequencyTable) -> bool {
        other.symbol_width() == self.table.symbol_width()
            && other.entries_sorted_by_symbol() == self.table.entries_sorted_by_symbol()
    }
}

#[cfg(test)]
mod test {
    use super::Coder;
    use crate::error::HuffError;
    use crate::huffman_coding::freq_table::FrequencyTable;

    #[test]
    fn empty_table_test() {
        let t = FrequencyTable::new(8).unwrap();
        assert!(matches!(
            Coder::new(t),
            Err(HuffError::UnsupportedConfiguration(_))
        ));
    }

    #[test]
    fn same_code_ignores_declared_size_test() {
        let mut t = FrequencyTable::new(8).unwrap();
        t.set_frequency(1, 2).unwrap();
        let coder = Coder::new(t.clone()).unwrap();
        t.set_declared_size(99);
        assert!(coder.same_code(&t));
        t.set_frequency(2, 1).unwrap();
        assert!(!coder.same_code(&t));
    }
}
