//! Text menu front end over the lending core

use std::ops::ControlFlow;

use tokio::io::{self, AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use crate::{
    error::{AppError, AppResult},
    models::Book,
    services::{parse_position, BookSelection, LendingCore, SearchField, SortKey},
};

type Step = io::Result<ControlFlow<()>>;

const MAIN_MENU: &str = "\
1. Register reader
2. Show readers
3. Add book
4. Show catalog
5. Search books
6. Borrow book
7. Return book
8. Exit";

const CATALOG_MENU: &str = "\
1. All books
2. Available books
3. Books borrowed by a reader
4. Sorted catalog
5. Back to main menu";

fn book_line(book: &Book) -> String {
    format!(
        "{} by {} (Available: {}/{})",
        book.title(),
        book.author(),
        book.available_quantity(),
        book.total_quantity()
    )
}

pub struct Console<R, W> {
    input: R,
    output: W,
}

impl<R, W> Console<R, W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    pub fn into_output(self) -> W {
        self.output
    }

    async fn say(&mut self, text: &str) -> io::Result<()> {
        self.output.write_all(text.as_bytes()).await?;
        self.output.write_all(b"\n").await?;
        self.output.flush().await
    }

    /// Print a prompt and read one trimmed line; `None` once input is closed
    async fn prompt(&mut self, text: &str) -> io::Result<Option<String>> {
        self.say(text).await?;
        let mut line = String::new();
        if self.input.read_line(&mut line).await? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }

    async fn list(&mut self, books: &[&Book]) -> io::Result<()> {
        if books.is_empty() {
            return self.say("No books to show.").await;
        }
        for book in books {
            self.say(&book_line(book)).await?;
        }
        Ok(())
    }

    async fn numbered(&mut self, books: &[&Book]) -> io::Result<()> {
        for (i, book) in books.iter().enumerate() {
            self.say(&format!("{}. {}", i + 1, book_line(book))).await?;
        }
        Ok(())
    }

    async fn report_error(&mut self, err: &AppError) -> io::Result<()> {
        if err.is_applied() {
            self.say(&format!("Warning: {}", err)).await
        } else {
            self.say(&format!("Error: {}", err)).await
        }
    }

    async fn report<T>(&mut self, result: AppResult<T>, done: impl FnOnce(T) -> String) -> io::Result<()> {
        match result {
            Ok(value) => self.say(&done(value)).await,
            Err(e) => self.report_error(&e).await,
        }
    }

    /// Run the menu until the user exits or input ends
    pub async fn run(&mut self, core: &mut LendingCore) -> io::Result<()> {
        loop {
            self.say("").await?;
            self.say(MAIN_MENU).await?;
            let Some(choice) = self.prompt("Choose an option:").await? else {
                break;
            };

            let step = match choice.as_str() {
                "1" => self.register_reader(core).await?,
                "2" => self.show_readers(core).await?,
                "3" => self.add_book(core).await?,
                "4" => self.show_catalog(core).await?,
                "5" => self.search(core).await?,
                "6" => self.borrow(core).await?,
                "7" => self.return_book(core).await?,
                "8" => ControlFlow::Break(()),
                _ => {
                    self.say("Invalid choice.").await?;
                    ControlFlow::Continue(())
                }
            };
            if step.is_break() {
                break;
            }
        }
        tracing::debug!("Console session ended");
        Ok(())
    }

    async fn register_reader(&mut self, core: &mut LendingCore) -> Step {
        let Some(name) = self.prompt("Enter reader name:").await? else {
            return Ok(ControlFlow::Break(()));
        };
        let result = core.register_reader(&name).await;
        self.report(result, |r| format!("Reader \"{}\" registered.", r.name())).await?;
        Ok(ControlFlow::Continue(()))
    }

    async fn show_readers(&mut self, core: &mut LendingCore) -> Step {
        let names: Vec<&str> = core.list_readers().iter().map(|r| r.name()).collect();
        if names.is_empty() {
            self.say("No readers registered.").await?;
        } else {
            let line = names.join(", ");
            self.say(&line).await?;
        }
        Ok(ControlFlow::Continue(()))
    }

    async fn add_book(&mut self, core: &mut LendingCore) -> Step {
        let Some(title) = self.prompt("Enter book title:").await? else {
            return Ok(ControlFlow::Break(()));
        };
        let Some(author) = self.prompt("Enter book author:").await? else {
            return Ok(ControlFlow::Break(()));
        };
        let result = core.add_book(&title, &author).await;
        self.report(result, |b| format!("Book added: {}", book_line(&b))).await?;
        Ok(ControlFlow::Continue(()))
    }

    async fn show_catalog(&mut self, core: &mut LendingCore) -> Step {
        self.say(CATALOG_MENU).await?;
        let Some(choice) = self.prompt("Choose an option:").await? else {
            return Ok(ControlFlow::Break(()));
        };

        match choice.as_str() {
            "1" => self.list(&core.list_all()).await?,
            "2" => self.list(&core.list_available()).await?,
            "3" => {
                let Some(name) = self.prompt("Enter reader name:").await? else {
                    return Ok(ControlFlow::Break(()));
                };
                match core.list_by_reader(&name) {
                    Ok(books) => self.list(&books).await?,
                    Err(e) => self.report_error(&e).await?,
                }
            }
            "4" => {
                let Some(field) = self.prompt("Sort by (title/author):").await? else {
                    return Ok(ControlFlow::Break(()));
                };
                match field.parse::<SortKey>() {
                    Ok(key) => self.list(&core.list_sorted(key)).await?,
                    Err(e) => self.report_error(&e).await?,
                }
            }
            "5" => {}
            _ => self.say("Invalid choice.").await?,
        }
        Ok(ControlFlow::Continue(()))
    }

    async fn search(&mut self, core: &mut LendingCore) -> Step {
        let Some(field) = self.prompt("Search by (title/author):").await? else {
            return Ok(ControlFlow::Break(()));
        };
        let field = match field.parse::<SearchField>() {
            Ok(field) => field,
            Err(e) => {
                self.report_error(&e).await?;
                return Ok(ControlFlow::Continue(()));
            }
        };
        let Some(query) = self.prompt("Enter search text:").await? else {
            return Ok(ControlFlow::Break(()));
        };
        self.list(&core.search(&query, field)).await?;
        Ok(ControlFlow::Continue(()))
    }

    /// Ask for a position until the core accepts it or fails for good
    async fn select(&mut self, core: &mut LendingCore, name: &str, lend: bool) -> Step {
        loop {
            let Some(input) = self.prompt("Enter book number:").await? else {
                return Ok(ControlFlow::Break(()));
            };
            let position = match parse_position(&input) {
                Ok(position) => position,
                Err(e) => {
                    self.report_error(&e).await?;
                    continue;
                }
            };

            let result = if lend {
                core.borrow(name, BookSelection::Position(position)).await
            } else {
                core.return_book(name, BookSelection::Position(position)).await
            };
            match result {
                Err(e) if e.is_retryable() => self.report_error(&e).await?,
                result => {
                    let verb = if lend { "borrowed" } else { "returned" };
                    self.report(result, |r| format!("\"{}\" {} {}.", r.reader, verb, r.book.title()))
                        .await?;
                    return Ok(ControlFlow::Continue(()));
                }
            }
        }
    }

    async fn borrow(&mut self, core: &mut LendingCore) -> Step {
        let Some(name) = self.prompt("Enter reader name:").await? else {
            return Ok(ControlFlow::Break(()));
        };
        if core.reader(&name).is_none() {
            self.report_error(&AppError::ReaderNotFound(name)).await?;
            return Ok(ControlFlow::Continue(()));
        }

        let available = core.list_available();
        if available.is_empty() {
            self.say("No books are currently available.").await?;
            return Ok(ControlFlow::Continue(()));
        }
        self.numbered(&available).await?;

        self.select(core, &name, true).await
    }

    async fn return_book(&mut self, core: &mut LendingCore) -> Step {
        let Some(name) = self.prompt("Enter reader name:").await? else {
            return Ok(ControlFlow::Break(()));
        };
        let held = match core.list_by_reader(&name) {
            Ok(books) => books,
            Err(e) => {
                self.report_error(&e).await?;
                return Ok(ControlFlow::Continue(()));
            }
        };
        if held.is_empty() {
            self.say("This reader has no borrowed books.").await?;
            return Ok(ControlFlow::Continue(()));
        }
        self.numbered(&held).await?;

        self.select(core, &name, false).await
    }
}
