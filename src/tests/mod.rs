mod xml;
