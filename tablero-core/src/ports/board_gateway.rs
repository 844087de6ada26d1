//! Board gateway port
//!
//! Defines the persistence boundary for boards, cards and column rules. The
//! production implementation talks to the board REST API; demo mode uses a
//! local DuckDB store.

use crate::domain::result::Result;
use crate::domain::{
    Board, BoardColumn, Card, ColumnDetailsDto, Comment, CreateCardDto, CreateColumnDto,
    CreateColumnRulesDto, CreateCommentDto, UpdateCardDto,
};

/// Access to the user's board.
///
/// Writes are last-write-wins: no version or ETag is checked and nothing is
/// retried. The board owner records card history for every card write.
pub trait BoardGateway: Send + Sync {
    /// Gateway name (e.g., "http", "demo")
    fn name(&self) -> &str;

    /// Fetch the current user's board with columns, cards and rules
    fn find_my_board(&self) -> Result<Board>;

    /// Replace a column's rules document
    ///
    /// # Arguments
    /// * `column_id` - Target column
    /// * `rules` - Complete rules document; no id in it is pending
    ///
    /// # Returns
    /// The updated column as stored
    fn update_column_rules(&self, column_id: &str, rules: &CreateColumnRulesDto) -> Result<BoardColumn>;

    /// Fetch one card with its history and comments
    fn get_card(&self, card_id: &str) -> Result<Card>;

    /// Add a column at the end of the board
    fn create_column(&self, column: &CreateColumnDto) -> Result<BoardColumn>;

    /// Change a column's name, description or color
    fn update_column(&self, column_id: &str, details: &ColumnDetailsDto) -> Result<BoardColumn>;

    /// Delete a column
    ///
    /// # Returns
    /// The column as it was before deletion
    fn delete_column(&self, board_id: &str, column_id: &str) -> Result<BoardColumn>;

    /// Add a card to a column
    fn create_card(&self, card: &CreateCardDto) -> Result<Card>;

    /// Apply a partial update to a card; a new `column_id` moves it
    fn update_card(&self, card_id: &str, changes: &UpdateCardDto) -> Result<Card>;

    fn add_comment(&self, comment: &CreateCommentDto) -> Result<Comment>;

    /// Delete a comment, returning it as it was
    fn delete_comment(&self, comment_id: &str) -> Result<Comment>;

    /// Attach a customer to a card
    fn link_customer(&self, card_id: &str, customer_id: &str) -> Result<Card>;

    /// Detach the card's customer, if any
    fn unlink_customer(&self, card_id: &str) -> Result<Card>;
}
