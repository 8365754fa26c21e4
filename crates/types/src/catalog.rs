//! The default item catalog.
//!
//! A fixed, ordered list of (name, base price) pairs. Every auction draws
//! from its own shuffled copy; the catalog itself is never mutated.

use crate::Item;

/// The stock catalog the server ships with: an IPL-style pool of cricketers.
pub fn default_catalog() -> Vec<Item> {
    [
        ("Virat Kohli", 20),
        ("Rohit Sharma", 18),
        ("Jasprit Bumrah", 17),
        ("Hardik Pandya", 16),
        ("Ravindra Jadeja", 15),
        ("KL Rahul", 14),
        ("Shubman Gill", 13),
        ("Suryakumar Yadav", 12),
        ("Shreyas Iyer", 11),
        ("Mohammed Shami", 10),
        ("Kuldeep Yadav", 9),
        ("Yuzvendra Chahal", 9),
        ("Axar Patel", 9),
        ("Ishan Kishan", 8),
        ("Ruturaj Gaikwad", 8),
        ("Prithvi Shaw", 7),
        ("Sanju Samson", 7),
        ("Rahul Tripathi", 7),
        ("Deepak Chahar", 6),
        ("Arshdeep Singh", 6),
        ("Shardul Thakur", 6),
        ("Washington Sundar", 6),
        ("Bhuvneshwar Kumar", 6),
        ("Umran Malik", 5),
        ("Mohammed Siraj", 5),
        ("Varun Chakravarthy", 5),
        ("Harshal Patel", 5),
        ("Dinesh Karthik", 4),
        ("Wriddhiman Saha", 4),
        ("Mayank Agarwal", 4),
        ("Devdutt Padikkal", 4),
        ("Tilak Varma", 4),
        ("Venkatesh Iyer", 4),
        ("Rahul Tewatia", 4),
        ("Ravi Bishnoi", 4),
        ("Shivam Dube", 3),
        ("Abhishek Sharma", 3),
        ("Sai Sudharsan", 3),
        ("T Natarajan", 3),
        ("Ajinkya Rahane", 3),
        ("Cheteshwar Pujara", 2),
    ]
    .into_iter()
    .map(|(name, base_price)| Item::new(name, base_price))
    .collect()
}
